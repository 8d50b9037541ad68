//! Synthetic sample generation
//!
//! Produces channel voltages that look like a quiet EEG recording: white
//! noise, an optional 10 Hz alpha rhythm on the first two channels and
//! optional mains interference on every channel.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Microvolts per volt
const UVOLTS: f64 = 1_000_000.0;
/// Alpha rhythm frequency
const ALPHA_HZ: f64 = 10.0;
/// Alpha rhythm amplitude in volts
const ALPHA_AMPLITUDE_V: f64 = 10.0 / UVOLTS;
/// Mains interference amplitude in volts
const LINE_NOISE_AMPLITUDE_V: f64 = 50.0 / UVOLTS;

/// Mains interference injected into the generated signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineNoise {
    /// 60 Hz mains (Americas)
    #[cfg_attr(feature = "serde", serde(rename = "60Hz"))]
    Hz60,
    /// 50 Hz mains
    #[cfg_attr(feature = "serde", serde(rename = "50Hz"))]
    Hz50,
    /// No mains interference
    #[cfg_attr(feature = "serde", serde(rename = "none"))]
    None,
}

impl LineNoise {
    /// All choices, default first
    pub const ALL: [LineNoise; 3] = [LineNoise::Hz60, LineNoise::Hz50, LineNoise::None];

    /// Label used in option objects
    pub fn label(&self) -> &'static str {
        match self {
            LineNoise::Hz60 => "60Hz",
            LineNoise::Hz50 => "50Hz",
            LineNoise::None => "none",
        }
    }

    /// Interference frequency, if any
    pub fn frequency_hz(&self) -> Option<f64> {
        match self {
            LineNoise::Hz60 => Some(60.0),
            LineNoise::Hz50 => Some(50.0),
            LineNoise::None => None,
        }
    }
}

/// One channel-data record, before packet encoding
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Sample number as carried in the packet
    pub sample_number: u8,
    /// Channel voltages in volts
    pub channel_data: Vec<f64>,
    /// Accelerometer X, Y, Z in g
    pub accel_data: [f64; 3],
    /// Raw auxiliary bytes
    pub aux_raw: [u8; 6],
}

/// Generator of synthetic sample records
pub struct SampleGenerator {
    channels: usize,
    sample_rate_hz: u32,
    alpha: bool,
    line_noise: LineNoise,
    alpha_phase: f64,
    line_phase: f64,
    rng: StdRng,
}

impl SampleGenerator {
    /// Create a generator for `channels` channels at `sample_rate_hz`
    pub fn new(channels: usize, sample_rate_hz: u32, alpha: bool, line_noise: LineNoise) -> Self {
        Self {
            channels,
            sample_rate_hz: sample_rate_hz.max(1),
            alpha,
            line_noise,
            alpha_phase: 0.0,
            line_phase: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Number of channels per record
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Generate the record for `sample_number`
    pub fn generate(&mut self, sample_number: u8) -> SampleRecord {
        let noise_scale = (self.sample_rate_hz as f64 / 2.0).sqrt() / UVOLTS;
        let alpha = self.alpha_phase.sin() * ALPHA_AMPLITUDE_V;
        let line = self.line_phase.sin() * LINE_NOISE_AMPLITUDE_V;

        let mut channel_data = Vec::with_capacity(self.channels);
        for channel in 0..self.channels {
            let mut value = self.gaussian() * noise_scale;
            if self.alpha && channel < 2 {
                value += alpha;
            }
            if self.line_noise != LineNoise::None {
                value += line;
            }
            channel_data.push(value);
        }

        let step = 2.0 * PI / self.sample_rate_hz as f64;
        self.alpha_phase = (self.alpha_phase + step * ALPHA_HZ) % (2.0 * PI);
        if let Some(hz) = self.line_noise.frequency_hz() {
            self.line_phase = (self.line_phase + step * hz) % (2.0 * PI);
        }

        // Board lying flat, a few milli-g of jitter
        let accel_data = [
            self.gaussian() * 0.002,
            self.gaussian() * 0.002,
            1.0 + self.gaussian() * 0.002,
        ];

        SampleRecord {
            sample_number,
            channel_data,
            accel_data,
            aux_raw: [0; 6],
        }
    }

    /// Standard normal sample (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
