//! # heleus-store — Durable Storage for Heleus
//!
//! The three storage components behind the repository service:
//!
//! - [`ArtifactStore`] — append-only, content-addressed APK blobs with
//!   atomic streaming commit.
//! - [`ApplicationRegistry`] — per-application push history and latest
//!   pointer, with per-application locking and point-in-time capture.
//! - [`SnapshotManager`] — immutable, uniquely named frozen versions.
//!
//! ## Data Directory
//!
//! ```text
//! {data_dir}/objects/{digest_hex}             artifacts
//! {data_dir}/staging/{uuid}.part              uploads in flight
//! {data_dir}/apps/{sha256(name)}.json         application records
//! {data_dir}/snapshots/{sha256(version)}.json frozen versions
//! {data_dir}/tmp/                             record staging
//! ```
//!
//! All three components may share one data directory. Registry and
//! snapshot state is loaded eagerly; artifacts stay on disk.

pub mod artifact;
pub mod error;
mod fsio;
pub mod registry;
pub mod snapshot;

pub use artifact::{Artifact, ArtifactStore, ArtifactWriter, OpenArtifact, PutOutcome};
pub use error::{ErrorKind, StoreError};
pub use registry::{AppSummary, Application, ApplicationRegistry, HistoryEntry, PushRecord};
pub use snapshot::{FrozenVersion, Resolution, SnapshotManager, VersionSummary};
