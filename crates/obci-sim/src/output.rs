//! Output buffer and fragmentation engine
//!
//! Everything the board sends passes through one fixed-size queue. The queue
//! is drained on its own timer, one fragment per emission, the fragment size
//! picked by the configured [`Fragmentation`] policy.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::trace;

use crate::config::Fragmentation;

/// Upper bound of a random fragment when less than this is queued
const RANDOM_FRAGMENT_FLOOR: usize = 62;

/// Fixed-capacity output queue with timed, fragmented emission
pub struct OutputBuffer {
    buffer: Box<[u8]>,
    queued: usize,
    deadline: Option<Instant>,
    fragmentation: Fragmentation,
    latency: Duration,
    rng: StdRng,
}

impl OutputBuffer {
    /// Create an empty buffer
    ///
    /// `latency` is the delay between emissions; callers pass zero for
    /// policies that bypass it.
    pub fn new(capacity: usize, fragmentation: Fragmentation, latency: Duration) -> Self {
        Self {
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            queued: 0,
            deadline: None,
            fragmentation,
            latency,
            rng: StdRng::from_entropy(),
        }
    }

    /// Buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes waiting to be emitted
    pub fn queued(&self) -> usize {
        self.queued
    }

    /// When the next emission is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Queue `data` for output
    ///
    /// If `data` does not fit, the queue is topped up and drained through
    /// `emit` until the rest fits. When no emission is scheduled one is
    /// started; with zero latency the first fragment goes out inline.
    pub fn write(&mut self, mut data: &[u8], now: Instant, mut emit: impl FnMut(Vec<u8>)) {
        if data.is_empty() {
            return;
        }

        while self.queued + data.len() > self.capacity() {
            let fit = self.capacity() - self.queued;
            self.buffer[self.queued..self.queued + fit].copy_from_slice(&data[..fit]);
            self.queued += fit;
            data = &data[fit..];

            trace!("Output overflow, draining {} bytes", self.queued);
            while self.queued > 0 {
                emit(self.take_fragment());
            }
            self.deadline = None;
        }

        self.buffer[self.queued..self.queued + data.len()].copy_from_slice(data);
        self.queued += data.len();

        if self.deadline.is_none() && self.queued > 0 {
            if self.latency.is_zero() {
                emit(self.take_fragment());
                if self.queued > 0 {
                    self.deadline = Some(now);
                }
            } else {
                self.deadline = Some(now + self.latency);
            }
        }
    }

    /// Emit the fragment due at the current deadline
    ///
    /// Reschedules one latency after the deadline that fired while bytes
    /// remain, otherwise goes idle.
    pub fn fire(&mut self) -> Option<Vec<u8>> {
        let deadline = self.deadline.take()?;
        if self.queued == 0 {
            return None;
        }

        let fragment = self.take_fragment();
        if self.queued > 0 {
            self.deadline = Some(deadline + self.latency);
        }
        Some(fragment)
    }

    /// Discard everything queued and cancel the pending emission
    pub fn flush(&mut self) -> usize {
        let discarded = self.queued;
        self.queued = 0;
        self.deadline = None;
        discarded
    }

    fn fragment_size(&mut self) -> usize {
        match self.fragmentation {
            Fragmentation::OneByOne => 1,
            Fragmentation::Random if self.rng.gen_bool(0.5) => {
                let max = self.queued.max(RANDOM_FRAGMENT_FLOOR);
                self.rng.gen_range(1..=max).min(self.queued)
            }
            Fragmentation::Random | Fragmentation::FullBuffers | Fragmentation::None => {
                self.queued
            }
        }
    }

    fn take_fragment(&mut self) -> Vec<u8> {
        let size = self.fragment_size().min(self.queued);
        let fragment = self.buffer[..size].to_vec();
        self.buffer.copy_within(size..self.queued, 0);
        self.queued -= size;
        fragment
    }
}
