//! Periodic sample stream

use std::time::Duration;

use obci_protocol::packet::{encode_packet, CHANNELS_PER_PACKET};
use obci_protocol::{LineNoise, PacketVariant, SampleGenerator};
use tokio::time::Instant;

/// Pick the packet layout for the current accelerometer and sync state
pub fn select_variant(accel: bool, synced: bool, sync_set: bool) -> PacketVariant {
    match (accel, synced, sync_set) {
        (true, true, true) => PacketVariant::AccelSyncSet,
        (true, true, false) => PacketVariant::AccelSynced,
        (false, true, true) => PacketVariant::RawAuxSyncSet,
        (false, true, false) => PacketVariant::RawAuxSynced,
        (true, false, _) => PacketVariant::Standard,
        (false, false, _) => PacketVariant::RawAuxStandard,
    }
}

/// Sample stream timer and counter
pub struct StreamEngine {
    generator: SampleGenerator,
    period: Duration,
    next_at: Option<Instant>,
    sample_counter: u8,
}

impl StreamEngine {
    pub fn new(period: Duration, sample_rate_hz: u32, alpha: bool, line_noise: LineNoise) -> Self {
        Self {
            generator: SampleGenerator::new(CHANNELS_PER_PACKET, sample_rate_hz, alpha, line_noise),
            period,
            next_at: None,
            sample_counter: 0,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.next_at.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_at
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number the next packet will carry
    pub fn sample_counter(&self) -> u8 {
        self.sample_counter
    }

    /// Start ticking one period from `now`; no-op while already streaming
    pub fn start(&mut self, now: Instant) -> bool {
        if self.next_at.is_some() {
            return false;
        }
        self.next_at = Some(now + self.period);
        true
    }

    /// Cancel the tick timer, keeping the sample counter
    pub fn stop(&mut self) -> bool {
        self.next_at.take().is_some()
    }

    /// Forget the sample counter, as on a fresh connection
    pub fn reset(&mut self) {
        self.next_at = None;
        self.sample_counter = 0;
    }

    /// Produce the packet due at the current deadline and schedule the next
    pub fn fire(&mut self, variant: PacketVariant, timestamp: u32) -> Option<Vec<u8>> {
        let deadline = self.next_at?;
        self.next_at = Some(deadline + self.period);

        let sample = self.generator.generate(self.sample_counter);
        self.sample_counter = self.sample_counter.wrapping_add(1);
        Some(encode_packet(&sample, variant, Some(timestamp)))
    }
}
