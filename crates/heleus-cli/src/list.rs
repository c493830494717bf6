//! # List Subcommand
//!
//! Prints repository state as aligned tables.

use anyhow::Result;
use clap::{Args, ValueEnum};
use heleus_client::HeleusClient;
use heleus_core::wire::{AppHistoryResponse, AppsResponse, VersionsResponse};

use crate::output::{or_dash, render_table, short_hash, timestamp};

/// Arguments for `heleus list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// What to list.
    #[arg(value_enum)]
    pub what: ListKind,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    /// Frozen versions.
    Versions,
    /// Applications with their latest artifact.
    Apps,
    /// Applications with their full push history.
    All,
}

pub async fn run_list(args: &ListArgs, client: &HeleusClient) -> Result<()> {
    let rendered = match args.what {
        ListKind::Versions => render_versions(&client.list_versions().await?),
        ListKind::Apps => render_apps(&client.list_apps().await?),
        ListKind::All => render_history(&client.list_all().await?),
    };
    print!("{rendered}");
    Ok(())
}

pub fn render_versions(resp: &VersionsResponse) -> String {
    if resp.versions.is_empty() {
        return "No frozen versions.\n".to_string();
    }
    let rows: Vec<Vec<String>> = resp
        .versions
        .iter()
        .map(|v| vec![v.version.to_string(), timestamp(&v.created_at)])
        .collect();
    render_table(&["VERSION", "CREATED"], &rows)
}

pub fn render_apps(resp: &AppsResponse) -> String {
    if resp.apps.is_empty() {
        return "No applications.\n".to_string();
    }
    let rows: Vec<Vec<String>> = resp
        .apps
        .iter()
        .map(|app| {
            vec![
                app.name.to_string(),
                short_hash(&app.latest_hash),
                timestamp(&app.last_updated),
                or_dash(app.version_tag.as_deref()),
            ]
        })
        .collect();
    render_table(&["NAME", "LATEST", "UPDATED", "TAG"], &rows)
}

pub fn render_history(resp: &AppHistoryResponse) -> String {
    if resp.apps.is_empty() {
        return "No applications.\n".to_string();
    }
    let mut out = String::new();
    for (i, app) in resp.apps.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{} ({} pushes)\n", app.name, app.versions.len()));
        let rows: Vec<Vec<String>> = app
            .versions
            .iter()
            .map(|v| {
                vec![
                    short_hash(&v.hash),
                    timestamp(&v.timestamp),
                    or_dash(v.version_tag.as_deref()),
                    or_dash(v.message.as_deref()),
                ]
            })
            .collect();
        out.push_str(&render_table(&["HASH", "PUSHED", "TAG", "MESSAGE"], &rows));
    }
    out
}
