//! # Freeze Subcommand

use anyhow::Result;
use clap::Args;
use heleus_client::HeleusClient;
use heleus_core::VersionName;

use crate::output::{render_table, timestamp};

/// Arguments for `heleus freeze`.
#[derive(Args, Debug)]
pub struct FreezeArgs {
    /// Name for the new frozen version.
    pub version: String,
}

pub async fn run_freeze(args: &FreezeArgs, client: &HeleusClient) -> Result<()> {
    let version = VersionName::new(args.version.as_str())?;
    let frozen = client.freeze(&version).await?;

    println!("{}", frozen.message);
    println!("  created: {}", timestamp(&frozen.created_at));
    let rows: Vec<Vec<String>> = frozen
        .apps
        .iter()
        .map(|(app, hash)| vec![app.to_string(), hash.to_hex()])
        .collect();
    print!("{}", render_table(&["APP", "HASH"], &rows));
    Ok(())
}
