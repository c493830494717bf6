//! # Pull Subcommand
//!
//! `heleus pull APP [VERSION]` writes `./APP/APP.apk`. Without an
//! application, every application is pulled as a bundle and extracted into
//! the destination directory; `--all VERSION` selects a frozen version for
//! the bundle.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use heleus_client::HeleusClient;
use heleus_core::{AppName, VersionSelector, LATEST};

use crate::progress::TerminalProgress;

/// Arguments for `heleus pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Application to pull. Omit to pull every application.
    pub app_name: Option<String>,
    /// Version to pull.
    #[arg(default_value = LATEST)]
    pub version: String,
    /// Pull every application; the first argument is read as the version.
    #[arg(short, long)]
    pub all: bool,
    /// Directory to write into.
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,
}

/// What a pull resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullTarget {
    App(AppName, VersionSelector),
    Bundle(VersionSelector),
}

impl PullArgs {
    pub fn target(&self) -> Result<PullTarget> {
        if self.all {
            if self.app_name.is_some() && self.version != LATEST {
                bail!("--all takes at most one version argument");
            }
            let version = self.app_name.as_deref().unwrap_or(&self.version);
            return Ok(PullTarget::Bundle(VersionSelector::parse(version)?));
        }
        let version = VersionSelector::parse(&self.version)?;
        Ok(match &self.app_name {
            Some(app) => PullTarget::App(AppName::new(app.as_str())?, version),
            None => PullTarget::Bundle(version),
        })
    }
}

pub async fn run_pull(args: &PullArgs, client: &HeleusClient) -> Result<()> {
    let progress = Arc::new(TerminalProgress::new());
    match args.target()? {
        PullTarget::App(app, version) => {
            let pulled = client.pull_app(&app, &version, &args.dest, progress).await?;
            println!("Successfully downloaded to {}", pulled.path.display());
            println!("  hash: {}", pulled.content_hash);
        }
        PullTarget::Bundle(version) => {
            let bundle = client.pull_bundle(&version, &args.dest, progress).await?;
            println!(
                "Successfully downloaded and extracted version {} ({} applications)",
                bundle.version,
                bundle.files.len()
            );
            for file in &bundle.files {
                println!("  {}", file.display());
            }
        }
    }
    Ok(())
}
