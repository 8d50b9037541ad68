//! Simulated OpenBCI Cyton board on stdin/stdout
//!
//! Handy for poking at the protocol by hand or for wiring the simulator to a
//! host driver through a pipe or a pty.

mod parse_args;

use anyhow::{bail, Context};
use obci_sim::{run_simulator_on_stream, Simulator, SimulatorConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn load_config(args: &parse_args::AppArgs) -> anyhow::Result<SimulatorConfig> {
    match (&args.options_json, &args.config_file) {
        (Some(_), Some(_)) => bail!("--options and --config are mutually exclusive"),
        (Some(json), None) => {
            SimulatorConfig::from_json_str(json).context("Invalid --options")
        }
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SimulatorConfig::from_json_str(&json)
                .with_context(|| format!("Invalid options in {}", path.display()))
        }
        (None, None) => Ok(SimulatorConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries board output, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "obci_sim=info,obci_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args::parse_args().context("Failed to parse arguments")?;
    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(
        "Simulating {} firmware on {} at {} Hz",
        config.firmware_version.label(),
        args.port_name,
        config.sample_rate_hz
    );

    let sim = Simulator::new(args.port_name, config);
    let stdio = tokio::io::join(tokio::io::stdin(), tokio::io::stdout());
    run_simulator_on_stream(stdio, sim).await?;

    info!("stdin closed, exiting");
    Ok(())
}
