//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor, plus the environment-driven server
//! configuration.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use heleus_store::StoreError;
use thiserror::Error;

use crate::middleware::metrics::ApiMetrics;
use crate::repository::RepositoryService;

/// Default artifact size ceiling: 512 MiB.
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 512 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind the HTTP server to.
    pub host: IpAddr,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Root of the artifact store, registry and snapshots.
    pub data_dir: PathBuf,
    /// Largest accepted artifact, in bytes.
    pub max_artifact_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 5000,
            data_dir: PathBuf::from("./heleus-data"),
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

/// An environment variable held a value that could not be used.
#[derive(Error, Debug)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HELEUS_HOST` | `0.0.0.0` |
    /// | `PORT` | `5000` |
    /// | `HELEUS_DATA_DIR` | `./heleus-data` |
    /// | `HELEUS_MAX_ARTIFACT_BYTES` | 512 MiB |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let host = parse_var(&lookup, "HELEUS_HOST")?.unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let data_dir = lookup("HELEUS_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let max_artifact_bytes: u64 = parse_var(&lookup, "HELEUS_MAX_ARTIFACT_BYTES")?
            .unwrap_or(defaults.max_artifact_bytes);
        if max_artifact_bytes == 0 {
            return Err(ConfigError {
                var: "HELEUS_MAX_ARTIFACT_BYTES",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Self {
            host,
            port,
            data_dir,
            max_artifact_bytes,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub repository: Arc<RepositoryService>,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
}

impl AppState {
    /// Open the data directory and build the state around it.
    pub fn open(config: AppConfig) -> Result<Self, StoreError> {
        let repository = RepositoryService::open(&config.data_dir, config.max_artifact_bytes)?;
        Ok(Self {
            repository: Arc::new(repository),
            metrics: ApiMetrics::new(),
            config,
        })
    }
}
