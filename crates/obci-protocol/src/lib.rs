//! OpenBCI Board Protocol Library
//!
//! This crate provides the wire-level pieces of the OpenBCI Cyton serial
//! protocol, shared by the board simulator and host-side tooling:
//!
//! - **Commands**: single-byte controls (`b`, `s`, `v`, ...) and the `0xF0`
//!   radio sub-protocol, with a streaming framer for byte streams
//! - **Responses**: the status strings and register dumps the firmware prints
//! - **Packets**: the fixed 33-byte sample frame in its six variants, with an
//!   encoder and a streaming decoder
//! - **Samples**: a synthetic sample generator feeding the packet encoder
//!
//! # Packet Format
//!
//! ```text
//! A0 [num] [8 x 24-bit channels] [6 aux bytes] C?
//! ```
//!
//! The low nibble of the stop byte selects the variant (accelerometer vs raw
//! aux, unsynced vs time-synced vs sync-set).
//!
//! # Example
//!
//! ```rust
//! use obci_protocol::packet::{encode_packet, PacketCodec, PacketVariant};
//! use obci_protocol::sample::{LineNoise, SampleGenerator};
//! use obci_protocol::ProtocolCodec;
//!
//! let mut generator = SampleGenerator::new(8, 250, true, LineNoise::Hz60);
//! let sample = generator.generate(0);
//! let bytes = encode_packet(&sample, PacketVariant::Standard, None);
//!
//! let mut codec = PacketCodec::new();
//! codec.push_bytes(&bytes);
//! let packet = codec.next_command().unwrap();
//! assert_eq!(packet.variant, PacketVariant::Standard);
//! assert_eq!(packet.sample_number, 0);
//! ```

pub mod command;
pub mod error;
pub mod packet;
pub mod responses;
pub mod sample;

pub use command::{Command, CommandCodec, RadioCommand, SdLogDuration};
pub use error::ParseError;
pub use packet::{Packet, PacketCodec, PacketVariant};
pub use sample::{LineNoise, SampleGenerator, SampleRecord};

/// Firmware generation reported by (and gating features of) the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FirmwareVersion {
    /// Original Cyton firmware
    V1,
    /// Firmware with radio sub-protocol and time sync
    V2,
    /// Firmware with the reworked accelerometer register layout
    V3,
}

impl FirmwareVersion {
    /// All versions, default first
    pub const ALL: [FirmwareVersion; 3] =
        [FirmwareVersion::V1, FirmwareVersion::V2, FirmwareVersion::V3];

    /// Short label used in option objects (`v1`, `v2`, `v3`)
    pub fn label(&self) -> &'static str {
        match self {
            FirmwareVersion::V1 => "v1",
            FirmwareVersion::V2 => "v2",
            FirmwareVersion::V3 => "v3",
        }
    }
}

/// Trait for codecs that frame items out of a raw byte stream
pub trait ProtocolCodec {
    /// The item type produced by this codec
    type Command;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete item from the buffer
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Try to extract the next complete item along with its raw bytes
    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)>;

    /// Clear the internal buffer
    fn clear(&mut self);
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}
