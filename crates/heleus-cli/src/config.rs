//! # Config Subcommand
//!
//! Reads and updates the local client configuration document.

use anyhow::Result;
use clap::{Args, Subcommand};
use heleus_client::ConfigStore;

/// Arguments for `heleus config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set the repository server address.
    Server {
        /// Server hostname or IP.
        host: String,
        /// Server port.
        port: u16,
    },
    /// Show the current configuration.
    Show,
}

pub fn run_config(args: &ConfigArgs, store: &ConfigStore) -> Result<()> {
    match &args.command {
        ConfigCommand::Server { host, port } => {
            let config = store.set_server(host, *port)?;
            println!("Server configuration updated: {}", config.server_url()?);
        }
        ConfigCommand::Show => {
            let config = store.load()?;
            println!("Current configuration:");
            println!("  Server: {}", config.server_url()?);
            println!("  File:   {}", store.path().display());
        }
    }
    Ok(())
}
