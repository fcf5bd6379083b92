#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for sewershed exposure tracing.
//!
//! Run with a subcommand for scripted use, or with none to get an
//! interactive menu. Uses `indicatif-log-bridge` (via
//! [`sewershed_cli_utils::init_logger`]) so log lines and progress bars
//! never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sewershed_config::{AppConfig, config_path};
use sewershed_trace::TraceMode;

use crate::commands::Context;

#[derive(Parser)]
#[command(name = "sewershed", about = "Wastewater exposure tracing tool")]
struct Cli {
    /// Config file (defaults to `$SEWERSHED_CONFIG`, then `sewershed.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List buildings that may have contributed to positive samples
    Buildings {
        /// Sampling date as spelled in the sheet (e.g. "6/7/21") or ISO
        date: String,
        /// detection, monitoring, sampling, or `paused_monitoring`
        #[arg(long, default_value_t = TraceMode::Detection)]
        mode: TraceMode,
    },
    /// List manholes upstream of positive samples
    Manholes {
        /// Sampling date as spelled in the sheet (e.g. "6/7/21") or ISO
        date: String,
        /// detection, monitoring, sampling, or `paused_monitoring`
        #[arg(long, default_value_t = TraceMode::Detection)]
        mode: TraceMode,
    },
    /// Composite monitoring status of every manhole
    Status {
        /// Sampling date
        date: String,
    },
    /// Residential and non-residential positivity rates
    Positivity {
        /// Sampling date; the rolling window ends here
        date: String,
    },
    /// Export the drop-in CSV for one date or an inclusive range
    Dropin {
        /// First date of the range
        from: String,
        /// Last date of the range (defaults to `from`)
        #[arg(long)]
        to: Option<String>,
        /// Output file (defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = sewershed_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = AppConfig::load(&config_path(cli.config.as_deref()))?;
    let ctx = Context::new(config, multi, cli.json);

    let Some(command) = cli.command else {
        return interactive::run(&ctx);
    };

    match command {
        Commands::Buildings { date, mode } => commands::buildings(&ctx, &date, mode)?,
        Commands::Manholes { date, mode } => commands::manholes(&ctx, &date, mode)?,
        Commands::Status { date } => commands::status(&ctx, &date)?,
        Commands::Positivity { date } => commands::positivity(&ctx, &date)?,
        Commands::Dropin { from, to, out } => {
            commands::drop_in(&ctx, &from, to.as_deref(), out.as_deref())?;
        }
    }

    Ok(())
}
