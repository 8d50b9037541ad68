use std::path::PathBuf;

use obci_sim::DEFAULT_PORT_NAME;

const HELP: &str = "\
obci-sim - Simulated OpenBCI Cyton board

Reads board commands from stdin and writes the board's output to stdout.
Logs go to stderr; set RUST_LOG to change the level.

USAGE:
  obci-sim [OPTIONS]

OPTIONS:
  -h, --help            Prints help information
  --port <name>         Port name the board reports (default: OpenBCISimulator)
  --options <json>      Simulator options as a JSON object
  --config <file>       Read simulator options from a JSON file
  --print-config        Print the normalized options and exit
";

#[derive(Debug)]
pub struct AppArgs {
    pub port_name: String,
    pub options_json: Option<String>,
    pub config_file: Option<PathBuf>,
    pub print_config: bool,
}

pub fn parse_args() -> Result<AppArgs, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        std::process::exit(0);
    }

    let args = AppArgs {
        print_config: pargs.contains("--print-config"),
        port_name: pargs
            .opt_value_from_str("--port")?
            .unwrap_or_else(|| DEFAULT_PORT_NAME.to_string()),
        options_json: pargs.opt_value_from_str("--options")?,
        config_file: pargs.opt_value_from_str("--config")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        eprintln!("Warning: unused arguments left: {:?}.", remaining);
    }

    Ok(args)
}
