//! # heleus-cli — Command-Line Sync Client
//!
//! Provides the `heleus` command:
//!
//! ```bash
//! heleus config server repo.internal 5000
//! heleus config show
//! heleus push build/calc.apk --message "nightly" --tag 1.4.0
//! heleus pull calc            # latest calc into ./calc/calc.apk
//! heleus pull calc r1         # calc as frozen in r1
//! heleus pull                 # every app at latest, extracted into .
//! heleus pull --all r1        # every app as frozen in r1
//! heleus freeze r1
//! heleus list versions|apps|all
//! ```
//!
//! Argument parsing lives in `main.rs`; each module here owns one
//! subcommand's arguments and handler. Remote commands check that the
//! server answers before doing anything else.

pub mod config;
pub mod freeze;
pub mod list;
pub mod output;
pub mod progress;
pub mod pull;
pub mod push;

use anyhow::{Context, Result};
use heleus_client::{ConfigStore, HeleusClient};

/// Build a client from the stored configuration and make sure the server
/// is reachable.
pub async fn connect(store: &ConfigStore) -> Result<HeleusClient> {
    let config = store.load()?;
    let client = HeleusClient::from_config(&config)?;
    let status = client
        .status()
        .await
        .with_context(|| format!("cannot connect to Heleus server at {}", client.base_url()))?;
    tracing::debug!(
        server = %client.base_url(),
        server_version = %status.version,
        apps = status.apps,
        "server reachable"
    );
    Ok(client)
}
