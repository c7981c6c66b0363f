//! ECU Sim - vehicle ECU network simulator
//!
//! Broadcasts simulated vehicle frames on a CAN bus and answers OBD-II
//! requests. Every subcommand except `simulate` runs a short in-process
//! simulation and prints JSON to stdout.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecu_sim::{init_logging, Settings};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::commands::{parse_byte, parse_can_id};

#[derive(Parser)]
#[command(name = "ecu-sim")]
#[command(author, version, about = "Vehicle ECU network simulator")]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to ./ecu-sim.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TOML signal catalog replacing the built-in vehicle catalog
    #[arg(long)]
    catalog: Option<String>,

    /// Fixed seed for reproducible signal values
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulator until Ctrl-C
    Simulate {
        /// TOML transmission profile
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Capture the simulated traffic for a while and print it
    Frames {
        /// Capture duration in seconds
        #[arg(long, default_value = "1.0")]
        seconds: f64,
    },

    /// Decode one frame against the catalog
    Decode {
        /// Arbitration id, `0x` hex or decimal
        #[arg(value_parser = parse_can_id)]
        id: u32,

        /// Payload: comma-separated bytes (`0x` hex or decimal) or space-separated hex
        data: String,
    },

    /// Print the values of one signal as they are transmitted
    Monitor {
        /// Signal name
        signal: String,

        /// Monitoring duration in seconds
        #[arg(long, default_value = "2.0")]
        seconds: f64,
    },

    /// Send one OBD-II request to the simulated ECU
    ObdRequest {
        /// Service (mode), `0x` hex or decimal
        #[arg(long, value_parser = parse_byte)]
        service: u8,

        /// Parameter id, `0x` hex or decimal
        #[arg(long, value_parser = parse_byte)]
        pid: Option<u8>,

        /// Seconds to wait for the response
        #[arg(long, default_value = "1.0")]
        timeout: f64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(&path.to_string_lossy())
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };
    if cli.catalog.is_some() {
        settings.catalog_path = cli.catalog.clone();
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }

    match &cli.command {
        Commands::Simulate { profile } => commands::simulate(&settings, profile.as_deref()).await,
        Commands::Frames { seconds } => commands::frames(&settings, *seconds).await,
        Commands::Decode { id, data } => commands::decode(&settings, *id, data),
        Commands::Monitor { signal, seconds } => {
            commands::monitor(&settings, signal, *seconds).await
        }
        Commands::ObdRequest {
            service,
            pid,
            timeout,
        } => commands::obd_request(&settings, *service, *pid, *timeout).await,
    }
}
