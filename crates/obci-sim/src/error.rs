//! Error types for the board simulator

use thiserror::Error;

/// Errors that can occur in the simulator
#[derive(Debug, Error)]
pub enum SimError {
    /// Option key the simulator does not know
    #[error("\"{0}\" is not a valid option")]
    UnknownOption(String),

    /// Options were not a JSON object
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Options were not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O attempted while the connection is closed
    #[error("not connected")]
    NotConnected,

    /// Open requested while already open
    #[error("already open")]
    AlreadyOpen,

    /// The simulator task has stopped
    #[error("simulator task closed")]
    TaskClosed,
}
