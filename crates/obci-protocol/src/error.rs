//! Error types for board protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Packet did not start with the 0xA0 start byte
    #[error("invalid start byte: 0x{0:02X}")]
    InvalidStartByte(u8),

    /// Stop byte does not name a known packet variant
    #[error("invalid stop byte: 0x{0:02X}")]
    InvalidStopByte(u8),

    /// Unknown or unsupported command
    #[error("unknown command: {0:02X?}")]
    UnknownCommand(Vec<u8>),
}
