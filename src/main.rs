//! modemsync: keeps a local registry of modem ports in step with a modem
//! control server.
//!
//! This is the main entry point for the modemsync binary. It parses the CLI,
//! initializes tracing, loads configuration and hands off to the command
//! handler.
//!
//! # I/O Architecture
//!
//! - **Activity log**: Session log lines (`[HH:MM:SS] message`) go to stdout
//!   and, when enabled, to the server's log endpoint
//! - **Debug logging**: tracing output goes to stderr, filtered by `-v`

use anyhow::{Context, Result};
use clap::Parser;
use modemsync::{cli::Cli, cli_handler, config::ConfigLoader};
use tracing::debug;

fn main() -> Result<()> {
    // Parse CLI arguments first (before any other initialization)
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    debug!("Parsed CLI arguments: {:?}", cli);

    // Load configuration with hierarchy merging
    let config = ConfigLoader::new()
        .load(&cli)
        .context("Failed to load configuration")?;

    debug!("Loaded configuration: {:?}", config);

    cli_handler::handle_command(&cli, config)
}

/// Initialize the tracing subscriber for debug/development logging.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
