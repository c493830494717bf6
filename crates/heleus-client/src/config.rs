//! Client configuration.
//!
//! The server address lives in a small JSON document,
//! `~/.heleus/config.json` by default:
//!
//! ```json
//! { "server": { "host": "localhost", "port": 5000 } }
//! ```
//!
//! Set `HELEUS_HOME` to keep the document somewhere else. A missing
//! document is created with the defaults on first use; one that cannot be
//! parsed is reported and the defaults are used instead.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable overriding the configuration directory.
pub const HOME_ENV: &str = "HELEUS_HOME";

const CONFIG_DIR: &str = ".heleus";
const CONFIG_FILE: &str = "config.json";

/// Address of the repository server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
        }
    }
}

/// The persisted client configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

impl ClientConfig {
    /// Base URL of the configured server, e.g. `http://localhost:5000/`.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let raw = format!("http://{}:{}", self.server.host, self.server.port);
        Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(raw, e.to_string()))
    }
}

/// Location of the configuration document on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// The default location: `$HELEUS_HOME/config.json`, else `~/.heleus/config.json`.
    pub fn locate() -> Result<Self, ConfigError> {
        let dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(CONFIG_DIR),
        };
        Ok(Self::in_dir(dir))
    }

    /// A store rooted at an explicit directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, creating it with the defaults if it does not exist.
    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = ClientConfig::default();
                self.save(&config)?;
                return Ok(config);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "ignoring unreadable configuration: {e}"
                );
                Ok(ClientConfig::default())
            }
        }
    }

    /// Replace the document.
    ///
    /// The new content is written to a temporary file in the same
    /// directory, fsynced, and renamed over the target. A failed save
    /// leaves the previous document in place and no temporary file behind.
    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        let dir = self
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        let mut body = serde_json::to_vec_pretty(config).map_err(ConfigError::Encode)?;
        body.push(b'\n');

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        staged.write_all(&body).map_err(|e| self.io_error(e))?;
        staged.as_file().sync_all().map_err(|e| self.io_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    /// Point the client at a different server, keeping the rest of the document.
    pub fn set_server(&self, host: &str, port: u16) -> Result<ClientConfig, ConfigError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ConfigError::InvalidUrl(
                host.to_string(),
                "host must not be empty".to_string(),
            ));
        }
        let mut config = self.load()?;
        config.server = ServerConfig {
            host: host.to_string(),
            port,
        };
        config.server_url()?;
        self.save(&config)?;
        Ok(config)
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot determine the home directory; set {HOME_ENV}")]
    NoHomeDir,
    #[error("configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot encode configuration: {0}")]
    Encode(serde_json::Error),
    #[error("invalid server address {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_localhost() {
        let config = ClientConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server_url().unwrap().as_str(), "http://localhost:5000/");
    }

    #[test]
    fn load_creates_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path().join("nested"));
        let config = store.load().unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(store.path().exists());
    }

    #[test]
    fn set_server_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        store.set_server("repo.internal", 8080).unwrap();

        let reloaded = ConfigStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(reloaded.server.host, "repo.internal");
        assert_eq!(reloaded.server.port, 8080);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["server"]["port"], 8080);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "only config.json should remain");
    }

    #[test]
    fn failed_save_leaves_no_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        // A directory in the document's place makes the final rename fail.
        std::fs::create_dir(store.path()).unwrap();

        assert!(matches!(
            store.save(&ClientConfig::default()),
            Err(ConfigError::Io { .. })
        ));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(store.path().is_dir());
    }

    #[test]
    fn corrupt_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        std::fs::write(store.path(), b"{ not json").unwrap();
        assert_eq!(store.load().unwrap(), ClientConfig::default());
    }

    #[test]
    fn blank_host_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::in_dir(dir.path());
        assert!(matches!(
            store.set_server("  ", 80),
            Err(ConfigError::InvalidUrl(..))
        ));
    }
}
