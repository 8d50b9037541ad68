//! Sample packet encoding and decoding
//!
//! Every sample travels as a fixed 33-byte frame:
//!
//! ```text
//! A0 [num] [ch1 .. ch8, 3 bytes each] [aux, 6 bytes] [stop]
//! ```
//!
//! The stop byte is `0xC0 | code`, where the code selects how the aux block
//! is interpreted:
//!
//! | stop | aux block |
//! |------|-----------|
//! | C0 | accelerometer X, Y, Z as i16 |
//! | C1 | six raw aux bytes |
//! | C3 / C4 | one accelerometer axis (i16) + u32 timestamp |
//! | C5 / C6 | two raw aux bytes + u32 timestamp |
//!
//! C3 and C5 mark the single "sync set" packet emitted after a clock sync.

use crate::error::ParseError;
use crate::sample::SampleRecord;
use crate::ProtocolCodec;

/// First byte of every packet
pub const START_BYTE: u8 = 0xA0;
/// High nibble of every stop byte
pub const STOP_BYTE_BASE: u8 = 0xC0;
/// Total packet length
pub const PACKET_SIZE: usize = 33;
/// Channels carried per packet
pub const CHANNELS_PER_PACKET: usize = 8;

/// Volts per channel count (4.5 V reference, gain 24, 24-bit signed)
pub const CHANNEL_SCALE: f64 = 4.5 / 24.0 / 8_388_607.0;
/// g per accelerometer count
pub const ACCEL_SCALE: f64 = 0.002 / 16.0;

const AUX_OFFSET: usize = 26;
const TIMESTAMP_OFFSET: usize = 28;

/// Packet layout, selected by the stop byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketVariant {
    /// Accelerometer data, no time sync
    Standard,
    /// Raw aux data, no time sync
    RawAuxStandard,
    /// Accelerometer axis + timestamp, first packet after a sync
    AccelSyncSet,
    /// Accelerometer axis + timestamp
    AccelSynced,
    /// Raw aux + timestamp, first packet after a sync
    RawAuxSyncSet,
    /// Raw aux + timestamp
    RawAuxSynced,
}

impl PacketVariant {
    /// Stop byte for this variant
    pub fn stop_byte(&self) -> u8 {
        STOP_BYTE_BASE
            | match self {
                PacketVariant::Standard => 0x0,
                PacketVariant::RawAuxStandard => 0x1,
                PacketVariant::AccelSyncSet => 0x3,
                PacketVariant::AccelSynced => 0x4,
                PacketVariant::RawAuxSyncSet => 0x5,
                PacketVariant::RawAuxSynced => 0x6,
            }
    }

    /// Variant named by a stop byte
    pub fn from_stop_byte(b: u8) -> Result<Self, ParseError> {
        match b {
            0xC0 => Ok(PacketVariant::Standard),
            0xC1 => Ok(PacketVariant::RawAuxStandard),
            0xC3 => Ok(PacketVariant::AccelSyncSet),
            0xC4 => Ok(PacketVariant::AccelSynced),
            0xC5 => Ok(PacketVariant::RawAuxSyncSet),
            0xC6 => Ok(PacketVariant::RawAuxSynced),
            _ => Err(ParseError::InvalidStopByte(b)),
        }
    }

    /// Whether the packet carries a timestamp
    pub fn is_time_synced(&self) -> bool {
        !matches!(
            self,
            PacketVariant::Standard | PacketVariant::RawAuxStandard
        )
    }

    /// Whether this is the one-off sync-set packet
    pub fn is_sync_set(&self) -> bool {
        matches!(
            self,
            PacketVariant::AccelSyncSet | PacketVariant::RawAuxSyncSet
        )
    }
}

/// A decoded packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sample number byte
    pub sample_number: u8,
    /// Layout variant
    pub variant: PacketVariant,
    /// Signed 24-bit channel counts
    pub channel_counts: [i32; CHANNELS_PER_PACKET],
    /// The raw aux block
    pub aux: [u8; 6],
    /// Board timestamp in ms (time-synced variants only)
    pub timestamp: Option<u32>,
}

/// Convert volts to a clamped signed 24-bit count
fn volts_to_counts(volts: f64) -> i32 {
    let counts = (volts / CHANNEL_SCALE).round();
    counts.clamp(-8_388_608.0, 8_388_607.0) as i32
}

/// Convert g to a clamped signed 16-bit count
fn g_to_counts(g: f64) -> i16 {
    (g / ACCEL_SCALE).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Accelerometer axis reported by a time-synced packet
///
/// The board spreads the three axes over samples 7, 8 and 9 of every ten.
fn synced_accel_axis(sample: &SampleRecord) -> i16 {
    match sample.sample_number % 10 {
        7 => g_to_counts(sample.accel_data[0]),
        8 => g_to_counts(sample.accel_data[1]),
        9 => g_to_counts(sample.accel_data[2]),
        _ => 0,
    }
}

/// Encode a sample record into a 33-byte packet
///
/// `timestamp` is written for the time-synced variants (0 if absent) and
/// ignored for the standard ones. Channels beyond the eighth are dropped;
/// missing channels encode as zero.
pub fn encode_packet(
    sample: &SampleRecord,
    variant: PacketVariant,
    timestamp: Option<u32>,
) -> Vec<u8> {
    let mut packet = vec![0u8; PACKET_SIZE];
    packet[0] = START_BYTE;
    packet[1] = sample.sample_number;

    for (i, volts) in sample
        .channel_data
        .iter()
        .take(CHANNELS_PER_PACKET)
        .enumerate()
    {
        let counts = volts_to_counts(*volts).to_be_bytes();
        let offset = 2 + i * 3;
        packet[offset..offset + 3].copy_from_slice(&counts[1..]);
    }

    match variant {
        PacketVariant::Standard => {
            for (axis, g) in sample.accel_data.iter().enumerate() {
                let offset = AUX_OFFSET + axis * 2;
                packet[offset..offset + 2].copy_from_slice(&g_to_counts(*g).to_be_bytes());
            }
        }
        PacketVariant::RawAuxStandard => {
            packet[AUX_OFFSET..AUX_OFFSET + 6].copy_from_slice(&sample.aux_raw);
        }
        PacketVariant::AccelSyncSet | PacketVariant::AccelSynced => {
            packet[AUX_OFFSET..TIMESTAMP_OFFSET]
                .copy_from_slice(&synced_accel_axis(sample).to_be_bytes());
        }
        PacketVariant::RawAuxSyncSet | PacketVariant::RawAuxSynced => {
            packet[AUX_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&sample.aux_raw[..2]);
        }
    }

    if variant.is_time_synced() {
        packet[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4]
            .copy_from_slice(&timestamp.unwrap_or(0).to_be_bytes());
    }

    packet[PACKET_SIZE - 1] = variant.stop_byte();
    packet
}

/// Decode one complete 33-byte packet
pub fn decode_packet(data: &[u8]) -> Result<Packet, ParseError> {
    if data.len() < PACKET_SIZE {
        return Err(ParseError::Incomplete {
            needed: PACKET_SIZE - data.len(),
        });
    }
    if data[0] != START_BYTE {
        return Err(ParseError::InvalidStartByte(data[0]));
    }
    let variant = PacketVariant::from_stop_byte(data[PACKET_SIZE - 1])?;

    let mut channel_counts = [0i32; CHANNELS_PER_PACKET];
    for (i, counts) in channel_counts.iter_mut().enumerate() {
        let offset = 2 + i * 3;
        let b = &data[offset..offset + 3];
        // Sign-extend from 24 bits
        *counts = i32::from_be_bytes([b[0], b[1], b[2], 0]) >> 8;
    }

    let mut aux = [0u8; 6];
    aux.copy_from_slice(&data[AUX_OFFSET..AUX_OFFSET + 6]);

    let timestamp = variant.is_time_synced().then(|| {
        u32::from_be_bytes([
            data[TIMESTAMP_OFFSET],
            data[TIMESTAMP_OFFSET + 1],
            data[TIMESTAMP_OFFSET + 2],
            data[TIMESTAMP_OFFSET + 3],
        ])
    });

    Ok(Packet {
        sample_number: data[1],
        variant,
        channel_counts,
        aux,
        timestamp,
    })
}

/// Streaming packet decoder
///
/// Resynchronizes on the start byte and skips anything that does not form a
/// valid packet, so textual responses interleaved with the sample stream are
/// passed over.
pub struct PacketCodec {
    buffer: Vec<u8>,
}

impl PacketCodec {
    /// Create a new packet codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(PACKET_SIZE * 4),
        }
    }

    /// Find the start byte position in the buffer
    fn find_start(&self) -> Option<usize> {
        self.buffer.iter().position(|&b| b == START_BYTE)
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for PacketCodec {
    type Command = Packet;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(packet, _)| packet)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        loop {
            let Some(start) = self.find_start() else {
                self.buffer.clear();
                return None;
            };
            if start > 0 {
                self.buffer.drain(..start);
            }
            if self.buffer.len() < PACKET_SIZE {
                return None;
            }

            match decode_packet(&self.buffer[..PACKET_SIZE]) {
                Ok(packet) => {
                    let bytes: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();
                    return Some((packet, bytes));
                }
                Err(e) => {
                    tracing::trace!("Skipping misaligned start byte: {}", e);
                    self.buffer.drain(..1);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}
