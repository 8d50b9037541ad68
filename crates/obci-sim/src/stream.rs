//! Drive a simulator from an async byte stream
//!
//! Lets host-side code talk to the simulated board over anything that looks
//! like a serial port: a `tokio::io::duplex` pair in tests, stdin/stdout in the
//! CLI.

use std::io;

use obci_protocol::{CommandCodec, ProtocolCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::events::SimulatorEvent;
use crate::simulator::Simulator;

/// Run `sim` over `stream` until the stream reaches EOF
///
/// Inbound bytes are framed into commands, so a host may write several
/// commands at once. Data events are written back to the stream. Commands
/// arriving before the board has booted are dropped.
pub async fn run_simulator_on_stream<S>(mut stream: S, mut sim: Simulator) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = CommandCodec::new();
    let mut buf = [0u8; 1024];

    info!("Starting simulator {} on stream", sim.port_name());
    if let Err(e) = sim.open(Instant::now()) {
        warn!("Simulator {} failed to open: {}", sim.port_name(), e);
    }

    loop {
        let mut wrote = false;
        while let Some(event) = sim.take_event() {
            match event {
                SimulatorEvent::Data(bytes) => {
                    stream.write_all(&bytes).await?;
                    wrote = true;
                }
                SimulatorEvent::Opened => info!("Simulator {} ready", sim.port_name()),
                SimulatorEvent::Closed => debug!("Simulator {} closed", sim.port_name()),
            }
        }
        if wrote {
            stream.flush().await?;
        }

        let deadline = sim.next_deadline();
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Stream closed for simulator {}", sim.port_name());
                        break;
                    }
                    Ok(n) => {
                        codec.push_bytes(&buf[..n]);
                        let now = Instant::now();
                        while let Some((command, bytes)) = codec.next_command_with_bytes() {
                            if let Err(e) = sim.write(&bytes, now) {
                                debug!("Dropping {:?}: {}", command, e);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Simulator {} stream error: {}", sim.port_name(), e);
                        return Err(e);
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
    }
    info!("Simulator {} stream task ended", sim.port_name());
    Ok(())
}
