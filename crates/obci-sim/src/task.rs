//! Simulator actor task
//!
//! This module provides an async task that owns a [`Simulator`] and drives its
//! timers. The task uses a select! loop to:
//! - Handle writes and lifecycle commands from a channel
//! - Sleep until the simulator's next deadline and fire due timers
//! - Forward simulator events to the host side

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::events::SimulatorEvent;
use crate::simulator::{Simulator, SimulatorSnapshot};

/// Capacity of the command channel
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Commands that can be sent to a simulator actor
#[derive(Debug)]
pub enum SimulatorCommand {
    /// Feed one command write to the board
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<(), SimError>>,
    },
    /// Boot the board again after a close
    Open {
        reply: oneshot::Sender<Result<(), SimError>>,
    },
    /// Close the connection
    Close {
        reply: oneshot::Sender<Result<(), SimError>>,
    },
    /// Read the current board state
    Snapshot {
        reply: oneshot::Sender<SimulatorSnapshot>,
    },
    /// Stop the actor
    Shutdown,
}

/// Run the simulator actor task
///
/// The board starts booting as soon as the task starts. The task ends on
/// [`SimulatorCommand::Shutdown`] or when every command sender is dropped.
pub async fn run_simulator_task(
    mut sim: Simulator,
    mut cmd_rx: mpsc::Receiver<SimulatorCommand>,
    event_tx: mpsc::UnboundedSender<SimulatorEvent>,
) {
    info!("Starting simulator task for {}", sim.port_name());

    if let Err(e) = sim.open(Instant::now()) {
        warn!("Simulator {} failed to open: {}", sim.port_name(), e);
    }

    loop {
        forward_events(&mut sim, &event_tx);

        let deadline = sim.next_deadline();
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SimulatorCommand::Write { data, reply }) => {
                        let result = sim.write(&data, Instant::now());
                        forward_events(&mut sim, &event_tx);
                        let _ = reply.send(result);
                    }
                    Some(SimulatorCommand::Open { reply }) => {
                        let _ = reply.send(sim.open(Instant::now()));
                    }
                    Some(SimulatorCommand::Close { reply }) => {
                        let result = sim.close();
                        forward_events(&mut sim, &event_tx);
                        let _ = reply.send(result);
                    }
                    Some(SimulatorCommand::Snapshot { reply }) => {
                        let _ = reply.send(sim.snapshot());
                    }
                    Some(SimulatorCommand::Shutdown) => {
                        info!("Shutdown requested for simulator {}", sim.port_name());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for simulator {}", sim.port_name());
                        break;
                    }
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                sim.fire_due(Instant::now());
            }
        }
    }

    if sim.is_open() {
        let _ = sim.close();
        forward_events(&mut sim, &event_tx);
    }
    info!("Simulator task ended for {}", sim.port_name());
}

/// Hand pending events to the host side, in order
///
/// Events emitted by a write reach the receiver before the write's reply.
fn forward_events(sim: &mut Simulator, event_tx: &mpsc::UnboundedSender<SimulatorEvent>) {
    while let Some(event) = sim.take_event() {
        // Nobody listening is fine, the board keeps running
        let _ = event_tx.send(event);
    }
}

/// Handle to a running simulator actor
#[derive(Debug, Clone)]
pub struct SimulatorHandle {
    cmd_tx: mpsc::Sender<SimulatorCommand>,
}

impl SimulatorHandle {
    /// Spawn a simulator actor on the current runtime
    ///
    /// Returns the handle and the receiver of everything the board emits.
    pub fn spawn(
        port_name: impl Into<String>,
        config: SimulatorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SimulatorEvent>) {
        let sim = Simulator::new(port_name, config);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_simulator_task(sim, cmd_rx, event_tx));
        (Self { cmd_tx }, event_rx)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SimulatorCommand,
    ) -> Result<T, SimError> {
        let (reply, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply))
            .await
            .map_err(|_| SimError::TaskClosed)?;
        reply_rx.await.map_err(|_| SimError::TaskClosed)
    }

    /// Write command bytes to the board
    pub async fn write(&self, data: impl Into<Vec<u8>>) -> Result<(), SimError> {
        let data = data.into();
        self.request(|reply| SimulatorCommand::Write { data, reply })
            .await?
    }

    /// Boot the board again after a close
    pub async fn open(&self) -> Result<(), SimError> {
        self.request(|reply| SimulatorCommand::Open { reply }).await?
    }

    /// Close the connection
    pub async fn close(&self) -> Result<(), SimError> {
        self.request(|reply| SimulatorCommand::Close { reply }).await?
    }

    /// Current board state
    pub async fn snapshot(&self) -> Result<SimulatorSnapshot, SimError> {
        self.request(|reply| SimulatorCommand::Snapshot { reply }).await
    }

    /// Stop the actor, closing the connection if it is open
    pub async fn shutdown(&self) -> Result<(), SimError> {
        self.cmd_tx
            .send(SimulatorCommand::Shutdown)
            .await
            .map_err(|_| SimError::TaskClosed)
    }
}
