//! Simulated Cyton board
//!
//! [`Simulator`] is a synchronous state machine. It never sleeps: every timer
//! (boot, sync acknowledgement, sync arm, sample stream, output emission) is
//! held as a deadline, and the driver calls [`Simulator::fire_due`] once the
//! earliest of them, [`Simulator::next_deadline`], has passed. Everything the
//! board says comes out as [`SimulatorEvent`]s, collected with
//! [`Simulator::take_event`].

use std::collections::VecDeque;
use std::time::Duration;

use obci_protocol::responses::{self, EOT, SD_CARD_PRESENT, SD_NO_OPEN_FILE, SYNC_TIME_SENT};
use obci_protocol::{Command, FirmwareVersion, SdLogDuration};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::events::SimulatorEvent;
use crate::output::OutputBuffer;
use crate::radio::RadioLink;
use crate::sd_log::SdLog;
use crate::streaming::{select_variant, StreamEngine};
use crate::sync::TimeSync;

/// Board activity: `info` when the simulator is verbose, `debug` otherwise
macro_rules! activity {
    ($sim:expr, $($arg:tt)+) => {
        if $sim.config.verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

/// Port name used when none is given
pub const DEFAULT_PORT_NAME: &str = "OpenBCISimulator";
/// Time the board takes to come up after open
pub const BOOT_DELAY: Duration = Duration::from_millis(200);

/// Timers in the order they fire when due at the same instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Timer {
    Boot,
    SyncAck,
    SyncArm,
    Stream,
    Output,
}

/// Point-in-time view of the board state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorSnapshot {
    pub port_name: String,
    pub connection_open: bool,
    pub booting: bool,
    pub streaming: bool,
    pub synced: bool,
    pub sync_set_armed: bool,
    pub daisy: bool,
    pub board_failure: bool,
    pub channel_number: u8,
    pub host_channel_number: u8,
    pub poll_time_ms: u8,
    pub sd_log_active: bool,
    pub sample_counter: u8,
    pub bytes_queued: usize,
}

/// A simulated OpenBCI Cyton board
pub struct Simulator {
    port_name: String,
    config: SimulatorConfig,
    epoch: Instant,
    connection_open: bool,
    boot_at: Option<Instant>,
    /// Runtime daisy state, changed by the max-channel commands
    daisy: bool,
    radio: RadioLink,
    sd_log: SdLog,
    sync: TimeSync,
    stream: StreamEngine,
    output: OutputBuffer,
    rng: StdRng,
    events: VecDeque<SimulatorEvent>,
}

impl Simulator {
    /// Create a closed simulator
    pub fn new(port_name: impl Into<String>, config: SimulatorConfig) -> Self {
        let port_name = port_name.into();
        info!("Creating simulator on {} with {:?}", port_name, config);

        let stream = StreamEngine::new(
            config.sample_period(),
            config.sample_rate_hz,
            config.alpha,
            config.line_noise_hz,
        );
        let output = OutputBuffer::new(
            config.buffer_capacity_bytes,
            config.fragmentation,
            config.effective_latency(),
        );

        Self {
            port_name,
            epoch: Instant::now(),
            connection_open: false,
            boot_at: None,
            daisy: config.daisy,
            radio: RadioLink::new(config.board_failure),
            sd_log: SdLog::default(),
            sync: TimeSync::default(),
            stream,
            output,
            rng: StdRng::from_entropy(),
            events: VecDeque::new(),
            config,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.connection_open
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_streaming()
    }

    /// Start the simulated boot; the connection opens [`BOOT_DELAY`] later
    pub fn open(&mut self, now: Instant) -> Result<(), SimError> {
        if self.connection_open || self.boot_at.is_some() {
            return Err(SimError::AlreadyOpen);
        }
        activity!(self, "Booting simulator on {}", self.port_name);
        self.boot_at = Some(now + BOOT_DELAY);
        Ok(())
    }

    /// Close the connection, discarding queued output and stopping all timers
    ///
    /// The board is not connected until it has booted, so closing while
    /// booting fails and the boot still completes.
    pub fn close(&mut self) -> Result<(), SimError> {
        if !self.connection_open {
            return Err(SimError::NotConnected);
        }

        let discarded = self.output.flush();
        self.stream.stop();
        self.sync.cancel();
        self.connection_open = false;
        info!(
            "Simulator on {} closed ({} queued bytes discarded)",
            self.port_name, discarded
        );
        self.events.push_back(SimulatorEvent::Closed);
        Ok(())
    }

    /// Discard queued output without closing
    pub fn flush(&mut self) {
        self.output.flush();
    }

    /// Feed one command write to the board
    pub fn write(&mut self, data: &[u8], now: Instant) -> Result<(), SimError> {
        if !self.connection_open {
            return Err(SimError::NotConnected);
        }

        let command = Command::parse(data);
        if self.config.verbose {
            info!("Write {:02X?} -> {:?}", data, command);
        } else {
            trace!("Write {:02X?} -> {:?}", data, command);
        }
        self.dispatch(command, now);
        Ok(())
    }

    fn dispatch(&mut self, command: Command, now: Instant) {
        let firmware = self.config.firmware_version;
        match command {
            Command::StreamStart => {
                if self.stream.start(now) {
                    activity!(self, "Streaming started");
                }
            }
            Command::StreamStop => {
                if self.stream.stop() {
                    activity!(self, "Streaming stopped");
                }
            }
            Command::SoftReset => {
                self.stream.stop();
                let mut response = responses::identification(self.daisy, firmware).into_bytes();
                response.extend_from_slice(EOT);
                self.send(&response, now);
            }
            Command::SdLogStart(duration) => self.start_sd_log(duration, now),
            Command::SdLogStop => self.stop_sd_log(now),
            Command::SyncTimeSet => {
                if firmware == FirmwareVersion::V2 {
                    activity!(self, "Time sync requested");
                    self.sync.request(now);
                }
            }
            Command::ChannelMax8 => {
                if self.daisy {
                    self.daisy = false;
                    self.send(responses::CHANNEL_MAX_8_DAISY_REMOVED, now);
                }
                self.send(EOT, now);
            }
            Command::ChannelMax16 => {
                let response = if self.daisy {
                    responses::CHANNEL_MAX_16_DAISY_ALREADY_ATTACHED
                } else if self.config.daisy_can_be_attached {
                    self.daisy = true;
                    responses::CHANNEL_MAX_16_DAISY_ATTACHED
                } else {
                    responses::CHANNEL_MAX_16_NO_DAISY
                };
                self.send(response, now);
                self.send(EOT, now);
            }
            Command::QueryRegisterSettings => {
                let registers = responses::register_query(self.daisy, firmware);
                self.send(registers.as_bytes(), now);
                self.send(EOT, now);
            }
            Command::Radio(radio) => {
                if firmware != FirmwareVersion::V2 {
                    trace!("Ignoring radio command {:?} on {:?}", radio, firmware);
                    return;
                }
                if let Some(response) = self.radio.handle(radio, self.config.serial_port_failure)
                {
                    self.send(&response, now);
                }
            }
            Command::Unknown(bytes) => {
                trace!("Ignoring unknown command {:02X?}", bytes);
            }
        }
    }

    fn start_sd_log(&mut self, duration: SdLogDuration, now: Instant) {
        if !self.stream.is_streaming() {
            self.send(SD_CARD_PRESENT, now);
            self.send(EOT, now);
        }
        activity!(self, "SD log started for {:?}", duration);
        self.sd_log.start(duration, now);
    }

    fn stop_sd_log(&mut self, now: Instant) {
        let report = self.sd_log.stop(now, &mut self.rng);
        if self.stream.is_streaming() {
            return;
        }
        match report {
            Some(report) => self.send(report.as_bytes(), now),
            None => self.send(SD_NO_OPEN_FILE, now),
        }
        self.send(EOT, now);
    }

    fn send(&mut self, bytes: &[u8], now: Instant) {
        let events = &mut self.events;
        self.output
            .write(bytes, now, |fragment| events.push_back(SimulatorEvent::Data(fragment)));
    }

    fn next_timer(&self) -> Option<(Instant, Timer)> {
        [
            (self.boot_at, Timer::Boot),
            (self.sync.ack_deadline(), Timer::SyncAck),
            (self.sync.arm_deadline(), Timer::SyncArm),
            (self.stream.deadline(), Timer::Stream),
            (self.output.deadline(), Timer::Output),
        ]
        .into_iter()
        .filter_map(|(deadline, timer)| deadline.map(|at| (at, timer)))
        .min()
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_timer().map(|(at, _)| at)
    }

    /// Fire every timer due at or before `now`, in deadline order
    pub fn fire_due(&mut self, now: Instant) {
        while let Some((at, timer)) = self.next_timer() {
            if at > now {
                break;
            }
            self.fire(timer, at);
        }
    }

    fn fire(&mut self, timer: Timer, at: Instant) {
        match timer {
            Timer::Boot => {
                self.boot_at = None;
                self.reset_session();
                self.connection_open = true;
                info!("Simulator on {} open", self.port_name);
                self.events.push_back(SimulatorEvent::Opened);
            }
            Timer::SyncAck => {
                if self.sync.fire_ack() {
                    self.send(SYNC_TIME_SENT, at);
                }
            }
            Timer::SyncArm => {
                if self.sync.fire_arm() {
                    activity!(self, "Next sample packet is the sync-set packet");
                }
            }
            Timer::Stream => {
                let synced = self.sync.is_synced();
                let sync_set = synced && self.sync.take_sync_set();
                let variant = select_variant(self.config.accel, synced, sync_set);
                let timestamp = self.timestamp(at);
                if let Some(packet) = self.stream.fire(variant, timestamp) {
                    self.send(&packet, at);
                }
            }
            Timer::Output => {
                if let Some(fragment) = self.output.fire() {
                    self.events.push_back(SimulatorEvent::Data(fragment));
                }
            }
        }
    }

    /// State that does not survive a close/reopen cycle
    fn reset_session(&mut self) {
        self.daisy = self.config.daisy;
        self.radio = RadioLink::new(self.config.board_failure);
        self.sd_log = SdLog::default();
        self.sync.reset();
        self.stream.reset();
        self.output.flush();
    }

    /// Milliseconds since construction, as carried by synced packets
    fn timestamp(&self, at: Instant) -> u32 {
        at.saturating_duration_since(self.epoch).as_millis() as u32
    }

    /// Next pending event
    pub fn take_event(&mut self) -> Option<SimulatorEvent> {
        self.events.pop_front()
    }

    /// All pending events
    pub fn drain_events(&mut self) -> Vec<SimulatorEvent> {
        self.events.drain(..).collect()
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        SimulatorSnapshot {
            port_name: self.port_name.clone(),
            connection_open: self.connection_open,
            booting: self.boot_at.is_some(),
            streaming: self.stream.is_streaming(),
            synced: self.sync.is_synced(),
            sync_set_armed: self.sync.is_armed(),
            daisy: self.daisy,
            board_failure: self.radio.board_failure,
            channel_number: self.radio.channel_number,
            host_channel_number: self.radio.host_channel_number,
            poll_time_ms: self.radio.poll_time_ms,
            sd_log_active: self.sd_log.is_active(),
            sample_counter: self.stream.sample_counter(),
            bytes_queued: self.output.queued(),
        }
    }
}
