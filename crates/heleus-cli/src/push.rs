//! # Push Subcommand
//!
//! Uploads one APK. The application name is the file's stem.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use heleus_client::{HeleusClient, PushOptions};

use crate::progress::TerminalProgress;

/// Arguments for `heleus push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to the APK file.
    pub apk_path: PathBuf,
    /// Free-form note stored with the push.
    #[arg(short, long)]
    pub message: Option<String>,
    /// Human-readable version label stored with the push.
    #[arg(short, long)]
    pub tag: Option<String>,
}

pub async fn run_push(args: &PushArgs, client: &HeleusClient) -> Result<()> {
    let options = PushOptions {
        message: args.message.clone(),
        version_tag: args.tag.clone(),
    };
    let pushed = client
        .push(&args.apk_path, options, Arc::new(TerminalProgress::new()))
        .await?;

    println!("{}", pushed.message);
    println!("  app:  {}", pushed.app_name);
    println!("  hash: {}", pushed.content_hash);
    if let Some(tag) = &pushed.version_tag {
        println!("  tag:  {tag}");
    }
    if pushed.deduplicated {
        println!("  (identical content was already stored)");
    }
    Ok(())
}
