//! Consignes CLI
//!
//! Command-line interface for the Consignes habit tracker.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use consignes_cli::Cli;
use consignes_cli::cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that command output stays pipeable
    let default_filter = if cli.verbose {
        "info,consignes=debug"
    } else if matches!(cli.command, Command::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    consignes_cli::run(cli).await?;
    Ok(())
}
