//! `postflow`: operator tooling for postflow automation records.

mod commands;
mod config;
mod error;

use crate::commands::{Command, Outcome};
use crate::config::CliConfig;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Inspect, check and dry-run postflow automations.
#[derive(Debug, Parser)]
#[command(name = "postflow")]
#[command(version)]
struct Cli {
    /// TOML configuration file; `POSTFLOW__*` environment variables override it.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&config.log_filter);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "postflow starting");

    let mut stdout = io::stdout().lock();
    match commands::run(cli.command, &config, &mut stdout).await {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Issues) => ExitCode::from(1),
        Err(report) => {
            tracing::error!(error = %report, "command failed");
            eprintln!("Error: {report}");
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
