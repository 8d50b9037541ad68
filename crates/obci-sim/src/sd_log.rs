//! Simulated SD card logging
//!
//! Nothing is written anywhere; the log only exists to answer the start and
//! stop commands the way the firmware does.

use obci_protocol::SdLogDuration;
use rand::Rng;
use tokio::time::Instant;

/// Upper bound of the reported max write time
const MAX_WRITE_TIME_US: u32 = 500;
/// Upper bound of the reported min write time
const MIN_WRITE_TIME_US: u32 = 200;

#[derive(Debug, Default)]
pub struct SdLog {
    started_at: Option<Instant>,
    duration: Option<SdLogDuration>,
}

impl SdLog {
    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn duration(&self) -> Option<SdLogDuration> {
        self.duration
    }

    pub fn start(&mut self, duration: SdLogDuration, now: Instant) {
        self.started_at = Some(now);
        self.duration = Some(duration);
    }

    /// Close the log, returning the stats report if one was open
    pub fn stop(&mut self, now: Instant, rng: &mut impl Rng) -> Option<String> {
        let started_at = self.started_at.take()?;
        self.duration = None;

        let elapsed = now.saturating_duration_since(started_at).as_millis();
        Some(format!(
            "Total Elapsed Time: {} ms\nMax write time: {} us\nMin write time: {} us\nOverruns: 0\n",
            elapsed,
            rng.gen_range(0..MAX_WRITE_TIME_US),
            rng.gen_range(0..MIN_WRITE_TIME_US),
        ))
    }
}
