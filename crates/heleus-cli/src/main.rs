//! # heleus CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Exit code is 0 on success and 1 on any failure, including argument
//! errors and an unreachable server.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use heleus_cli::config::{run_config, ConfigArgs};
use heleus_cli::connect;
use heleus_cli::freeze::{run_freeze, FreezeArgs};
use heleus_cli::list::{run_list, ListArgs};
use heleus_cli::pull::{run_pull, PullArgs};
use heleus_cli::push::{run_push, PushArgs};
use heleus_client::ConfigStore;

/// Heleus — APK version management.
///
/// Push APKs to a Heleus repository, pull the latest or a frozen version
/// of one application or all of them, and freeze the current state under
/// a version name.
#[derive(Parser, Debug)]
#[command(name = "heleus", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the repository server.
    Config(ConfigArgs),

    /// Push an APK to the repository.
    Push(PushArgs),

    /// Pull one APK, or every APK as a bundle.
    Pull(PullArgs),

    /// Freeze the latest state of every application as a named version.
    Freeze(FreezeArgs),

    /// List frozen versions or applications.
    List(ListArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let store = ConfigStore::locate()?;
    tracing::debug!(config = %store.path().display(), "using configuration");

    match command {
        Commands::Config(args) => run_config(&args, &store),
        Commands::Push(args) => run_push(&args, &connect(&store).await?).await,
        Commands::Pull(args) => run_pull(&args, &connect(&store).await?).await,
        Commands::Freeze(args) => run_freeze(&args, &connect(&store).await?).await,
        Commands::List(args) => run_list(&args, &connect(&store).await?).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heleus_cli::list::ListKind;

    #[test]
    fn cli_parse_config_server() {
        let cli = Cli::try_parse_from(["heleus", "config", "server", "repo.local", "8080"]).unwrap();
        match cli.command {
            Commands::Config(ConfigArgs {
                command: heleus_cli::config::ConfigCommand::Server { host, port },
            }) => {
                assert_eq!(host, "repo.local");
                assert_eq!(port, 8080);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parse_push_with_metadata() {
        let cli = Cli::try_parse_from([
            "heleus", "push", "calc.apk", "--message", "nightly", "-t", "1.2",
        ])
        .unwrap();
        if let Commands::Push(args) = cli.command {
            assert_eq!(args.apk_path, std::path::PathBuf::from("calc.apk"));
            assert_eq!(args.message.as_deref(), Some("nightly"));
            assert_eq!(args.tag.as_deref(), Some("1.2"));
        } else {
            panic!("expected push");
        }
    }

    #[test]
    fn cli_parse_pull_defaults() {
        let cli = Cli::try_parse_from(["heleus", "pull", "calc"]).unwrap();
        if let Commands::Pull(args) = cli.command {
            assert_eq!(args.app_name.as_deref(), Some("calc"));
            assert_eq!(args.version, "latest");
            assert!(!args.all);
        } else {
            panic!("expected pull");
        }
    }

    #[test]
    fn cli_parse_list_kind() {
        let cli = Cli::try_parse_from(["heleus", "list", "all"]).unwrap();
        if let Commands::List(args) = cli.command {
            assert_eq!(args.what, ListKind::All);
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn cli_parse_verbosity_is_global() {
        let cli = Cli::try_parse_from(["heleus", "list", "apps", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_rejects_unknown_list_kind() {
        assert!(Cli::try_parse_from(["heleus", "list", "everything"]).is_err());
    }

    #[test]
    fn cli_rejects_port_out_of_range() {
        assert!(Cli::try_parse_from(["heleus", "config", "server", "h", "70000"]).is_err());
    }
}
