#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # consignes-cli
//!
//! Terminal front end for Consignes:
//! - Showing, filling and submitting daily and practice forms
//! - Managing consignes and their categories
//! - Running the caching proxy
//! - Reading and editing the configuration file

pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;
pub mod error;

pub use cli::Cli;
pub use config::ConsignesConfig;
pub use error::{Error, Result};

use cli::Command;

/// Runs a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Config { action } => config_handlers::handle_config_command(config_path, action),
        Command::Form { action } => {
            let config = ConsignesConfig::load(config_path)?;
            commands::form::handle(&config, action).await
        }
        Command::Consigne { action } => {
            let config = ConsignesConfig::load(config_path)?;
            commands::consigne::handle(&config, action).await
        }
        Command::Serve { bind } => {
            let config = ConsignesConfig::load(config_path)?;
            commands::serve::handle(&config, bind.as_deref()).await
        }
    }
}
