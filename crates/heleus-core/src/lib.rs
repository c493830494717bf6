//! # heleus-core — Foundational Types for Heleus
//!
//! Heleus distributes Android application packages through a central
//! repository: clients push APKs, the repository tracks the latest
//! artifact per application, and operators freeze the whole set into
//! immutable named versions that can be pulled back at any time.
//!
//! This crate holds the types every other crate agrees on:
//!
//! - [`ContentDigest`] — SHA-256 over raw artifact bytes, the primary key
//!   of the artifact store.
//! - [`AppName`] / [`VersionName`] — validated, case-sensitive names that
//!   are safe to use as file names.
//! - [`wire`] — JSON bodies of the HTTP protocol.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `heleus-*` crates (leaf of the DAG).
//! - No `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod name;
pub mod wire;

pub use digest::{sha256_digest, ContentDigest, ContentHasher};
pub use error::ValidationError;
pub use name::{AppName, VersionName, VersionSelector, LATEST};
