//! OpenBCI Board Simulation Library
//!
//! This crate provides a software stand-in for an OpenBCI Cyton board, for
//! testing host drivers without physical hardware. It includes:
//!
//! - **Simulator**: the board itself, a synchronous state machine that
//!   interprets commands, streams sample packets and runs the time-sync
//!   handshake, with all timers held as deadlines
//! - **OutputBuffer**: the fixed-size output queue and its fragmentation
//!   policies, mimicking how bytes trickle out of a real serial link
//! - **SimulatorHandle**: an async actor owning a simulator and driving its
//!   timers on tokio
//! - **run_simulator_on_stream**: the same, over any async byte stream
//!
//! # Example
//!
//! ```rust
//! use obci_sim::{Simulator, SimulatorConfig, SimulatorEvent, BOOT_DELAY};
//! use tokio::time::Instant;
//!
//! let start = Instant::now();
//! let mut sim = Simulator::new("OpenBCISimulator", SimulatorConfig::default());
//! sim.open(start).unwrap();
//! sim.fire_due(start + BOOT_DELAY);
//! assert_eq!(sim.take_event(), Some(SimulatorEvent::Opened));
//!
//! // Query the 8-channel mode; no daisy is attached so only `$$$` comes back
//! sim.write(b"c", start + BOOT_DELAY).unwrap();
//! assert_eq!(sim.take_event(), Some(SimulatorEvent::Data(b"$$$".to_vec())));
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod radio;
pub mod sd_log;
pub mod simulator;
pub mod stream;
pub mod streaming;
pub mod sync;
pub mod task;

pub use config::{Fragmentation, SimulatorConfig};
pub use error::SimError;
pub use events::SimulatorEvent;
pub use output::OutputBuffer;
pub use simulator::{Simulator, SimulatorSnapshot, BOOT_DELAY, DEFAULT_PORT_NAME};
pub use stream::run_simulator_on_stream;
pub use task::{run_simulator_task, SimulatorCommand, SimulatorHandle};
