//! Host-to-board commands
//!
//! Most board commands are a single ASCII byte. The radio link configuration
//! commands (firmware v2) are framed behind the `0xF0` prefix:
//!
//! ```text
//! F0 [sub] [arg]
//! ```
//!
//! where `arg` is present only for set-channel, set-channel-override and
//! set-poll-time.

use crate::error::ParseError;
use crate::{EncodeCommand, ProtocolCodec};

/// Start streaming sample packets
pub const STREAM_START: u8 = b'b';
/// Stop streaming sample packets
pub const STREAM_STOP: u8 = b's';
/// Soft reset, board prints its identification
pub const SOFT_RESET: u8 = b'v';
/// Dump register settings
pub const QUERY_REGISTER_SETTINGS: u8 = b'?';
/// Stop SD card logging
pub const SD_LOG_STOP: u8 = b'j';
/// Set clock sync time (firmware v2)
pub const SYNC_TIME_SET: u8 = b'<';
/// Limit the board to 8 channels (removes daisy)
pub const CHANNEL_MAX_8: u8 = b'c';
/// Allow 16 channels (attaches daisy)
pub const CHANNEL_MAX_16: u8 = b'C';
/// Prefix of a radio sub-protocol frame
pub const RADIO_KEY: u8 = 0xF0;

/// Radio sub-command: get channel
pub const RADIO_CHANNEL_GET: u8 = 0x00;
/// Radio sub-command: set channel (argument follows)
pub const RADIO_CHANNEL_SET: u8 = 0x01;
/// Radio sub-command: host-only channel override (argument follows)
pub const RADIO_CHANNEL_SET_OVERRIDE: u8 = 0x02;
/// Radio sub-command: get poll time
pub const RADIO_POLL_TIME_GET: u8 = 0x03;
/// Radio sub-command: set poll time (argument follows)
pub const RADIO_POLL_TIME_SET: u8 = 0x04;
/// Radio sub-command: switch to 115200 baud
pub const RADIO_BAUD_RATE_SET_DEFAULT: u8 = 0x05;
/// Radio sub-command: switch to 230400 baud
pub const RADIO_BAUD_RATE_SET_FAST: u8 = 0x06;
/// Radio sub-command: system status
pub const RADIO_SYSTEM_STATUS: u8 = 0x07;

/// Highest radio channel the board accepts
pub const RADIO_CHANNEL_MAX: u8 = 25;

/// Duration requested by an SD log start command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdLogDuration {
    /// About 14 seconds (`a`)
    Sec14,
    /// 5 minutes (`A`)
    Min5,
    /// 15 minutes (`S`)
    Min15,
    /// 30 minutes (`F`)
    Min30,
    /// 1 hour (`G`)
    Hour1,
    /// 2 hours (`H`)
    Hour2,
    /// 4 hours (`J`)
    Hour4,
    /// 12 hours (`K`)
    Hour12,
    /// 24 hours (`L`)
    Hour24,
}

impl SdLogDuration {
    /// Decode an SD log start byte
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'a' => Some(Self::Sec14),
            b'A' => Some(Self::Min5),
            b'S' => Some(Self::Min15),
            b'F' => Some(Self::Min30),
            b'G' => Some(Self::Hour1),
            b'H' => Some(Self::Hour2),
            b'J' => Some(Self::Hour4),
            b'K' => Some(Self::Hour12),
            b'L' => Some(Self::Hour24),
            _ => None,
        }
    }

    /// The command byte for this duration
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Sec14 => b'a',
            Self::Min5 => b'A',
            Self::Min15 => b'S',
            Self::Min30 => b'F',
            Self::Hour1 => b'G',
            Self::Hour2 => b'H',
            Self::Hour4 => b'J',
            Self::Hour12 => b'K',
            Self::Hour24 => b'L',
        }
    }
}

/// Radio sub-protocol command (the bytes after `0xF0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCommand {
    /// Report the current radio channel
    ChannelGet,
    /// Set board and host radio channel
    ChannelSet(u8),
    /// Set only the host radio channel
    ChannelSetOverride(u8),
    /// Report the poll time
    PollTimeGet,
    /// Set the poll time
    PollTimeSet(u8),
    /// Switch the link to 115200 baud
    BaudRateSetDefault,
    /// Switch the link to 230400 baud
    BaudRateSetFast,
    /// Report whether the board is reachable
    SystemStatus,
}

impl RadioCommand {
    /// Number of argument bytes that follow the given sub-command byte
    pub fn argument_len(sub: u8) -> usize {
        match sub {
            RADIO_CHANNEL_SET | RADIO_CHANNEL_SET_OVERRIDE | RADIO_POLL_TIME_SET => 1,
            _ => 0,
        }
    }

    /// The sub-command selector byte
    pub fn sub_command(&self) -> u8 {
        match self {
            RadioCommand::ChannelGet => RADIO_CHANNEL_GET,
            RadioCommand::ChannelSet(_) => RADIO_CHANNEL_SET,
            RadioCommand::ChannelSetOverride(_) => RADIO_CHANNEL_SET_OVERRIDE,
            RadioCommand::PollTimeGet => RADIO_POLL_TIME_GET,
            RadioCommand::PollTimeSet(_) => RADIO_POLL_TIME_SET,
            RadioCommand::BaudRateSetDefault => RADIO_BAUD_RATE_SET_DEFAULT,
            RadioCommand::BaudRateSetFast => RADIO_BAUD_RATE_SET_FAST,
            RadioCommand::SystemStatus => RADIO_SYSTEM_STATUS,
        }
    }
}

impl TryFrom<&[u8]> for RadioCommand {
    type Error = ParseError;

    /// Parse the bytes following the `0xF0` prefix
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let Some(&sub) = data.first() else {
            return Err(ParseError::Incomplete { needed: 1 });
        };
        let arg = || {
            data.get(1)
                .copied()
                .ok_or(ParseError::Incomplete { needed: 1 })
        };

        match sub {
            RADIO_CHANNEL_GET => Ok(Self::ChannelGet),
            RADIO_CHANNEL_SET => Ok(Self::ChannelSet(arg()?)),
            RADIO_CHANNEL_SET_OVERRIDE => Ok(Self::ChannelSetOverride(arg()?)),
            RADIO_POLL_TIME_GET => Ok(Self::PollTimeGet),
            RADIO_POLL_TIME_SET => Ok(Self::PollTimeSet(arg()?)),
            RADIO_BAUD_RATE_SET_DEFAULT => Ok(Self::BaudRateSetDefault),
            RADIO_BAUD_RATE_SET_FAST => Ok(Self::BaudRateSetFast),
            RADIO_SYSTEM_STATUS => Ok(Self::SystemStatus),
            _ => Err(ParseError::UnknownCommand(vec![RADIO_KEY, sub])),
        }
    }
}

impl EncodeCommand for RadioCommand {
    fn encode(&self) -> Vec<u8> {
        let mut out = vec![RADIO_KEY, self.sub_command()];
        match self {
            RadioCommand::ChannelSet(n)
            | RadioCommand::ChannelSetOverride(n)
            | RadioCommand::PollTimeSet(n) => out.push(*n),
            _ => {}
        }
        out
    }
}

/// Board command as interpreted from its leading byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `b`
    StreamStart,
    /// `s`
    StreamStop,
    /// `v`
    SoftReset,
    /// One of the SD log start bytes
    SdLogStart(SdLogDuration),
    /// `j`
    SdLogStop,
    /// `<`
    SyncTimeSet,
    /// `c`
    ChannelMax8,
    /// `C`
    ChannelMax16,
    /// `?`
    QueryRegisterSettings,
    /// `0xF0` radio frame
    Radio(RadioCommand),
    /// Anything the board does not recognize (ignored by the firmware)
    Unknown(Vec<u8>),
}

impl Command {
    /// Interpret a command from its raw bytes
    ///
    /// Only the first byte selects the command; for radio frames the second
    /// byte selects the sub-command and the third carries its argument.
    /// Unrecognized or truncated input yields [`Command::Unknown`].
    pub fn parse(data: &[u8]) -> Command {
        let Some(&selector) = data.first() else {
            return Command::Unknown(Vec::new());
        };

        match selector {
            STREAM_START => Command::StreamStart,
            STREAM_STOP => Command::StreamStop,
            SOFT_RESET => Command::SoftReset,
            SD_LOG_STOP => Command::SdLogStop,
            SYNC_TIME_SET => Command::SyncTimeSet,
            CHANNEL_MAX_8 => Command::ChannelMax8,
            CHANNEL_MAX_16 => Command::ChannelMax16,
            QUERY_REGISTER_SETTINGS => Command::QueryRegisterSettings,
            RADIO_KEY => match RadioCommand::try_from(&data[1..]) {
                Ok(radio) => Command::Radio(radio),
                Err(e) => {
                    tracing::debug!("Unrecognized radio frame {:02X?}: {}", data, e);
                    Command::Unknown(data.to_vec())
                }
            },
            b => match SdLogDuration::from_byte(b) {
                Some(duration) => Command::SdLogStart(duration),
                None => Command::Unknown(data.to_vec()),
            },
        }
    }
}

impl EncodeCommand for Command {
    fn encode(&self) -> Vec<u8> {
        match self {
            Command::StreamStart => vec![STREAM_START],
            Command::StreamStop => vec![STREAM_STOP],
            Command::SoftReset => vec![SOFT_RESET],
            Command::SdLogStart(duration) => vec![duration.to_byte()],
            Command::SdLogStop => vec![SD_LOG_STOP],
            Command::SyncTimeSet => vec![SYNC_TIME_SET],
            Command::ChannelMax8 => vec![CHANNEL_MAX_8],
            Command::ChannelMax16 => vec![CHANNEL_MAX_16],
            Command::QueryRegisterSettings => vec![QUERY_REGISTER_SETTINGS],
            Command::Radio(radio) => radio.encode(),
            Command::Unknown(bytes) => bytes.clone(),
        }
    }
}

/// Streaming command framer for host-to-board byte streams
///
/// Splits an arbitrary chunking of the inbound stream back into the command
/// boundaries a host driver wrote: radio frames keep their sub-command and
/// argument bytes together, every other byte is a command of its own.
pub struct CommandCodec {
    buffer: Vec<u8>,
}

impl CommandCodec {
    /// Create a new command codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(16),
        }
    }

    /// Length of the frame at the head of the buffer, if complete
    fn frame_len(&self) -> Option<usize> {
        let first = *self.buffer.first()?;
        if first != RADIO_KEY {
            return Some(1);
        }
        let sub = *self.buffer.get(1)?;
        let len = 2 + RadioCommand::argument_len(sub);
        (self.buffer.len() >= len).then_some(len)
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for CommandCodec {
    type Command = Command;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(cmd, _)| cmd)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        let len = self.frame_len()?;
        let bytes: Vec<u8> = self.buffer.drain(..len).collect();
        Some((Command::parse(&bytes), bytes))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}
