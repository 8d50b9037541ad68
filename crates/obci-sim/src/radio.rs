//! Radio link sub-protocol
//!
//! The Cyton talks to the host through a dongle; the `0xF0` commands
//! configure that link. [`RadioLink`] holds the link state and answers the
//! commands, including the fault-injected paths where the board or the host
//! serial port is unreachable.

use obci_protocol::command::RADIO_CHANNEL_MAX;
use obci_protocol::responses::{
    BAUD_RATE_COMPLETE, BAUD_RATE_DEFAULT_NOTICE, BAUD_RATE_FAST_NOTICE, CHANNEL_OUT_OF_RANGE,
    COMMS_TIMEOUT, EOT, FAILURE_PREFIX, SUCCESS_PREFIX, SYSTEM_DOWN, SYSTEM_UP,
};
use obci_protocol::RadioCommand;
use tracing::debug;

/// Radio channel both ends start on
pub const DEFAULT_CHANNEL: u8 = 1;
/// Poll time the host dongle starts with
pub const DEFAULT_POLL_TIME_MS: u8 = 80;

/// Radio link state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioLink {
    pub channel_number: u8,
    pub host_channel_number: u8,
    pub poll_time_ms: u8,
    /// Board unreachable over the air
    pub board_failure: bool,
}

impl RadioLink {
    pub fn new(board_failure: bool) -> Self {
        Self {
            channel_number: DEFAULT_CHANNEL,
            host_channel_number: DEFAULT_CHANNEL,
            poll_time_ms: DEFAULT_POLL_TIME_MS,
            board_failure,
        }
    }

    /// Apply a radio command, returning the response if the host gets one
    ///
    /// With `serial_port_failure` set, commands that need the board answer
    /// nothing while the board is unreachable.
    pub fn handle(&mut self, command: RadioCommand, serial_port_failure: bool) -> Option<Vec<u8>> {
        debug!("Radio command {:?} on {:?}", command, self);
        match command {
            RadioCommand::ChannelGet => {
                if !self.board_failure {
                    Some(success(
                        format!("Host and Device on Channel Number {}", self.channel_number),
                        Some(self.channel_number),
                    ))
                } else if !serial_port_failure {
                    Some(failure(
                        format!("Host on Channel Number {}", self.host_channel_number),
                        Some(self.host_channel_number),
                    ))
                } else {
                    None
                }
            }
            RadioCommand::ChannelSet(channel) => {
                if !self.board_failure {
                    if channel <= RADIO_CHANNEL_MAX {
                        self.channel_number = channel;
                        self.host_channel_number = channel;
                        Some(success(format!("Channel Number {}", channel), Some(channel)))
                    } else {
                        Some(out_of_range())
                    }
                } else {
                    comms_timeout(serial_port_failure)
                }
            }
            RadioCommand::ChannelSetOverride(channel) => {
                if channel <= RADIO_CHANNEL_MAX {
                    self.board_failure = channel != self.channel_number;
                    self.host_channel_number = channel;
                    Some(success(
                        format!("Host override - Channel Number {}", channel),
                        Some(channel),
                    ))
                } else {
                    Some(out_of_range())
                }
            }
            RadioCommand::PollTimeGet | RadioCommand::PollTimeSet(_) => {
                if self.board_failure {
                    return comms_timeout(serial_port_failure);
                }
                if let RadioCommand::PollTimeSet(poll_time) = command {
                    self.poll_time_ms = poll_time;
                }
                Some(success(
                    format!("Poll Time {}", self.poll_time_ms),
                    Some(self.poll_time_ms),
                ))
            }
            RadioCommand::BaudRateSetDefault => Some(baud_rate_notice(BAUD_RATE_DEFAULT_NOTICE)),
            RadioCommand::BaudRateSetFast => Some(baud_rate_notice(BAUD_RATE_FAST_NOTICE)),
            RadioCommand::SystemStatus => {
                if !self.board_failure {
                    Some(success(SYSTEM_UP, None))
                } else {
                    Some(failure(SYSTEM_DOWN, None))
                }
            }
        }
    }
}

fn frame(prefix: &[u8], message: impl AsRef<[u8]>, value: Option<u8>) -> Vec<u8> {
    let mut out = prefix.to_vec();
    out.extend_from_slice(message.as_ref());
    out.extend(value);
    out.extend_from_slice(EOT);
    out
}

fn success(message: impl AsRef<[u8]>, value: Option<u8>) -> Vec<u8> {
    frame(SUCCESS_PREFIX, message, value)
}

fn failure(message: impl AsRef<[u8]>, value: Option<u8>) -> Vec<u8> {
    frame(FAILURE_PREFIX, message, value)
}

fn out_of_range() -> Vec<u8> {
    failure(CHANNEL_OUT_OF_RANGE, None)
}

fn comms_timeout(serial_port_failure: bool) -> Option<Vec<u8>> {
    (!serial_port_failure).then(|| failure(COMMS_TIMEOUT, None))
}

/// The board skips the usual `$$$` and sends its own completion token
fn baud_rate_notice(notice: &[u8]) -> Vec<u8> {
    let mut out = SUCCESS_PREFIX.to_vec();
    out.extend_from_slice(notice);
    out.extend_from_slice(&BAUD_RATE_COMPLETE);
    out
}
