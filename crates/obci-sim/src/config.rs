//! Simulator configuration
//!
//! Options arrive as a loosely typed JSON object (the shape host test suites
//! pass around) and are normalized once, at construction:
//!
//! - an unknown key is an error
//! - an enumerated option with a value outside its choices falls back to the
//!   first choice
//! - a boolean or integer option with a value of the wrong type, or an
//!   integer out of range, falls back to its default

use std::time::Duration;

use obci_protocol::{FirmwareVersion, LineNoise};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SimError;

/// Every option key the simulator accepts
pub const OPTION_KEYS: [&str; 14] = [
    "accel",
    "alpha",
    "boardFailure",
    "daisy",
    "daisyCanBeAttached",
    "drift",
    "firmwareVersion",
    "fragmentation",
    "latencyTimeMs",
    "bufferCapacityBytes",
    "lineNoiseHz",
    "sampleRateHz",
    "serialPortFailure",
    "verbose",
];

/// How queued output is split into emitted fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Fragmentation {
    /// Everything queued, no latency
    None,
    /// Coin flip between a random-sized fragment and everything queued
    Random,
    /// Everything queued, after the latency
    FullBuffers,
    /// One byte per emission, no latency
    OneByOne,
}

impl Fragmentation {
    /// All policies, default first
    pub const ALL: [Fragmentation; 4] = [
        Fragmentation::None,
        Fragmentation::Random,
        Fragmentation::FullBuffers,
        Fragmentation::OneByOne,
    ];

    /// Label used in option objects
    pub fn label(&self) -> &'static str {
        match self {
            Fragmentation::None => "none",
            Fragmentation::Random => "random",
            Fragmentation::FullBuffers => "fullBuffers",
            Fragmentation::OneByOne => "oneByOne",
        }
    }

    /// Whether this policy ignores the configured latency
    pub fn bypasses_latency(&self) -> bool {
        matches!(self, Fragmentation::None | Fragmentation::OneByOne)
    }
}

/// Normalized simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Include accelerometer data in packets
    pub accel: bool,
    /// Inject an alpha rhythm on the first two channels
    pub alpha: bool,
    /// Radio link reports the board unreachable
    pub board_failure: bool,
    /// Start with the daisy module attached
    pub daisy: bool,
    /// Whether the 16-channel command can attach a daisy
    pub daisy_can_be_attached: bool,
    /// Clock drift of the board, carried for host test suites
    pub drift: f64,
    /// Firmware generation
    pub firmware_version: FirmwareVersion,
    /// Output fragmentation policy
    pub fragmentation: Fragmentation,
    /// Delay between output emissions
    pub latency_time_ms: u64,
    /// Output buffer capacity
    pub buffer_capacity_bytes: usize,
    /// Mains interference in the generated signal
    pub line_noise_hz: LineNoise,
    /// Samples per second while streaming
    pub sample_rate_hz: u32,
    /// Radio link to the host serial port is dead
    pub serial_port_failure: bool,
    /// Log board activity at `info` instead of `debug`
    pub verbose: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            accel: true,
            alpha: true,
            board_failure: false,
            daisy: false,
            daisy_can_be_attached: true,
            drift: 0.0,
            firmware_version: FirmwareVersion::V1,
            fragmentation: Fragmentation::None,
            latency_time_ms: 16,
            buffer_capacity_bytes: 4096,
            line_noise_hz: LineNoise::Hz60,
            sample_rate_hz: 250,
            serial_port_failure: false,
            verbose: false,
        }
    }
}

impl SimulatorConfig {
    /// Normalize an option object
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, SimError> {
        if let Some(key) = options
            .keys()
            .find(|key| !OPTION_KEYS.contains(&key.as_str()))
        {
            return Err(SimError::UnknownOption(key.clone()));
        }

        let defaults = Self::default();
        Ok(Self {
            accel: bool_option(options, "accel", defaults.accel),
            alpha: bool_option(options, "alpha", defaults.alpha),
            board_failure: bool_option(options, "boardFailure", defaults.board_failure),
            daisy: bool_option(options, "daisy", defaults.daisy),
            daisy_can_be_attached: bool_option(
                options,
                "daisyCanBeAttached",
                defaults.daisy_can_be_attached,
            ),
            drift: number_option(options, "drift", defaults.drift),
            firmware_version: choice_option(
                options,
                "firmwareVersion",
                &FirmwareVersion::ALL,
                FirmwareVersion::label,
            ),
            fragmentation: choice_option(
                options,
                "fragmentation",
                &Fragmentation::ALL,
                Fragmentation::label,
            ),
            latency_time_ms: integer_option(options, "latencyTimeMs", 0, defaults.latency_time_ms),
            buffer_capacity_bytes: integer_option(
                options,
                "bufferCapacityBytes",
                1,
                defaults.buffer_capacity_bytes as u64,
            ) as usize,
            line_noise_hz: choice_option(
                options,
                "lineNoiseHz",
                &LineNoise::ALL,
                LineNoise::label,
            ),
            sample_rate_hz: integer_option(
                options,
                "sampleRateHz",
                1,
                defaults.sample_rate_hz as u64,
            )
            .min(u32::MAX as u64) as u32,
            serial_port_failure: bool_option(
                options,
                "serialPortFailure",
                defaults.serial_port_failure,
            ),
            verbose: bool_option(options, "verbose", defaults.verbose),
        })
    }

    /// Normalize options given as a JSON string
    ///
    /// `null` means all defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(options) => Self::from_options(&options),
            Value::Null => Ok(Self::default()),
            other => Err(SimError::InvalidOptions(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Latency actually applied between emissions
    pub fn effective_latency(&self) -> Duration {
        if self.fragmentation.bypasses_latency() {
            Duration::ZERO
        } else {
            Duration::from_millis(self.latency_time_ms)
        }
    }

    /// Period of the sample stream, never shorter than 2 ms
    pub fn sample_period(&self) -> Duration {
        let period = Duration::from_secs_f64(1.0 / self.sample_rate_hz.max(1) as f64);
        period.max(Duration::from_millis(2))
    }
}

fn bool_option(options: &Map<String, Value>, key: &str, default: bool) -> bool {
    match options.get(key) {
        None => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!("Option {} expects a boolean, got {}; using {}", key, other, default);
            default
        }
    }
}

fn number_option(options: &Map<String, Value>, key: &str, default: f64) -> f64 {
    match options.get(key) {
        None => default,
        Some(value) => value.as_f64().unwrap_or_else(|| {
            warn!("Option {} expects a number, got {}; using {}", key, value, default);
            default
        }),
    }
}

fn integer_option(options: &Map<String, Value>, key: &str, min: u64, default: u64) -> u64 {
    match options.get(key) {
        None => default,
        Some(value) => match value.as_u64() {
            Some(n) if n >= min => n,
            _ => {
                warn!(
                    "Option {} expects an integer >= {}, got {}; using {}",
                    key, min, value, default
                );
                default
            }
        },
    }
}

/// Pick the choice whose label matches, else the first choice
fn choice_option<T: Copy>(
    options: &Map<String, Value>,
    key: &str,
    choices: &[T],
    label: fn(&T) -> &'static str,
) -> T {
    let default = choices[0];
    let Some(value) = options.get(key) else {
        return default;
    };

    let chosen = value
        .as_str()
        .and_then(|s| choices.iter().find(|choice| label(*choice) == s).copied());
    match chosen {
        Some(choice) => choice,
        None => {
            debug!(
                "Option {} value {} is not one of the choices; using {}",
                key,
                value,
                label(&default)
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = SimulatorConfig::from_options(&Map::new()).unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.firmware_version, FirmwareVersion::V1);
        assert_eq!(config.fragmentation, Fragmentation::None);
        assert_eq!(config.line_noise_hz, LineNoise::Hz60);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let err = SimulatorConfig::from_options(&options(json!({ "bogus": 1 }))).unwrap_err();
        assert!(matches!(err, SimError::UnknownOption(ref k) if k == "bogus"));
        assert_eq!(err.to_string(), "\"bogus\" is not a valid option");
    }

    #[test]
    fn test_choice_values() {
        let config = SimulatorConfig::from_options(&options(json!({
            "firmwareVersion": "v2",
            "fragmentation": "oneByOne",
            "lineNoiseHz": "none",
        })))
        .unwrap();
        assert_eq!(config.firmware_version, FirmwareVersion::V2);
        assert_eq!(config.fragmentation, Fragmentation::OneByOne);
        assert_eq!(config.line_noise_hz, LineNoise::None);
    }

    #[test]
    fn test_out_of_enumeration_falls_back_to_first_choice() {
        let config = SimulatorConfig::from_options(&options(json!({
            "firmwareVersion": "v9",
            "fragmentation": 3,
            "lineNoiseHz": "40Hz",
        })))
        .unwrap();
        assert_eq!(config.firmware_version, FirmwareVersion::V1);
        assert_eq!(config.fragmentation, Fragmentation::None);
        assert_eq!(config.line_noise_hz, LineNoise::Hz60);
    }

    #[test]
    fn test_scalar_options() {
        let config = SimulatorConfig::from_options(&options(json!({
            "accel": false,
            "daisy": true,
            "latencyTimeMs": 0,
            "bufferCapacityBytes": 64,
            "sampleRateHz": 1000,
        })))
        .unwrap();
        assert!(!config.accel);
        assert!(config.daisy);
        assert_eq!(config.latency_time_ms, 0);
        assert_eq!(config.buffer_capacity_bytes, 64);
        assert_eq!(config.sample_rate_hz, 1000);
    }

    #[test]
    fn test_bad_scalars_fall_back() {
        let config = SimulatorConfig::from_options(&options(json!({
            "accel": "yes",
            "bufferCapacityBytes": 0,
            "sampleRateHz": -5,
            "latencyTimeMs": 1.5,
        })))
        .unwrap();
        assert!(config.accel);
        assert_eq!(config.buffer_capacity_bytes, 4096);
        assert_eq!(config.sample_rate_hz, 250);
        assert_eq!(config.latency_time_ms, 16);
    }

    #[test]
    fn test_verbose_option() {
        let config = SimulatorConfig::from_json_str(r#"{"verbose":true}"#).unwrap();
        assert!(config.verbose);
        assert_eq!(
            SimulatorConfig {
                verbose: false,
                ..config
            },
            SimulatorConfig::default()
        );

        let config = SimulatorConfig::from_json_str(r#"{"verbose":1}"#).unwrap();
        assert!(!config.verbose);
    }

    #[test]
    fn test_drift_option() {
        let config = SimulatorConfig::from_json_str(r#"{"drift":-3}"#).unwrap();
        assert_eq!(config.drift, -3.0);

        let config = SimulatorConfig::from_json_str(r#"{"drift":0.25}"#).unwrap();
        assert_eq!(config.drift, 0.25);

        let config = SimulatorConfig::from_json_str(r#"{"drift":"fast"}"#).unwrap();
        assert_eq!(config.drift, 0.0);
    }

    #[test]
    fn test_from_json_str() {
        let config = SimulatorConfig::from_json_str(r#"{"firmwareVersion":"v3"}"#).unwrap();
        assert_eq!(config.firmware_version, FirmwareVersion::V3);

        assert_eq!(
            SimulatorConfig::from_json_str("null").unwrap(),
            SimulatorConfig::default()
        );
        assert!(matches!(
            SimulatorConfig::from_json_str("[1, 2]"),
            Err(SimError::InvalidOptions(_))
        ));
        assert!(matches!(
            SimulatorConfig::from_json_str("{"),
            Err(SimError::Json(_))
        ));
    }

    #[test]
    fn test_effective_latency() {
        let mut config = SimulatorConfig::default();
        assert_eq!(config.effective_latency(), Duration::ZERO);

        config.fragmentation = Fragmentation::FullBuffers;
        assert_eq!(config.effective_latency(), Duration::from_millis(16));

        config.fragmentation = Fragmentation::OneByOne;
        assert_eq!(config.effective_latency(), Duration::ZERO);
    }

    #[test]
    fn test_sample_period_floor() {
        let mut config = SimulatorConfig::default();
        assert_eq!(config.sample_period(), Duration::from_millis(4));

        config.sample_rate_hz = 16_000;
        assert_eq!(config.sample_period(), Duration::from_millis(2));
    }
}
