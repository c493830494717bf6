//! # heleus-client — Typed Rust client for the Heleus repository
//!
//! Talks to a `heleus-server` over HTTP:
//! - **push** streams a local APK from disk with progress reporting
//! - **pull** writes a single artifact to `<dest>/<app>/<app>.apk`, verified
//!   against the digest the server announces, or downloads a bundle of
//!   every application and extracts it into `<dest>`
//! - **freeze** and the listing calls return the shared wire types from
//!   [`heleus_core::wire`]
//!
//! The server address comes from a small JSON document managed by
//! [`ConfigStore`].

pub mod client;
pub mod config;
pub mod error;
pub mod progress;
pub(crate) mod transfer;

pub use client::{HeleusClient, PulledArtifact, PulledBundle, PushOptions};
pub use config::{ClientConfig, ConfigError, ConfigStore, ServerConfig};
pub use error::ClientError;
pub use progress::{NoProgress, ProgressObserver, ProgressReader};
