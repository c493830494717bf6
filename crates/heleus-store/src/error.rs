//! # Storage Error Types
//!
//! One enum for the three storage components. Variants are fine-grained
//! so callers can tell *which* lookup failed; [`StoreError::kind`]
//! collapses them onto the protocol-level taxonomy.

use std::path::PathBuf;

use heleus_core::{AppName, ContentDigest, ValidationError, VersionName};
use thiserror::Error;

/// Errors from the artifact store, registry, and snapshot manager.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No artifact is stored under this digest.
    #[error("artifact {0} not found")]
    ArtifactNotFound(ContentDigest),

    /// No application has been pushed under this name.
    #[error("application '{0}' not found")]
    AppNotFound(AppName),

    /// No frozen version exists with this name.
    #[error("version '{0}' not found")]
    VersionNotFound(VersionName),

    /// The version exists but did not include the application.
    #[error("application '{app}' is not part of version '{version}'")]
    AppNotInVersion { version: VersionName, app: AppName },

    /// A frozen version with this name already exists.
    #[error("version '{0}' already exists")]
    VersionExists(VersionName),

    /// Freeze was requested before any application was pushed.
    #[error("cannot freeze an empty registry")]
    EmptyRegistry,

    /// The uploaded byte stream was rejected (empty or oversize).
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// A name or digest failed validation.
    #[error(transparent)]
    InvalidName(#[from] ValidationError),

    /// Stored bytes no longer hash to their address.
    #[error("integrity violation: artifact stored as {expected} hashes to {actual}")]
    Integrity {
        expected: ContentDigest,
        actual: ContentDigest,
    },

    /// A persisted record could not be decoded.
    #[error("corrupt record at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Protocol-level classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArtifact,
    Internal,
}

impl StoreError {
    /// Classify the error for callers that only care about the outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArtifactNotFound(_)
            | Self::AppNotFound(_)
            | Self::VersionNotFound(_)
            | Self::AppNotInVersion { .. } => ErrorKind::NotFound,
            Self::VersionExists(_) | Self::EmptyRegistry => ErrorKind::Conflict,
            Self::InvalidArtifact(_) | Self::InvalidName(_) => ErrorKind::InvalidArtifact,
            Self::Integrity { .. }
            | Self::Corrupt { .. }
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_classify_as_not_found() {
        let app = AppName::new("calc").unwrap();
        let version = VersionName::new("r1").unwrap();
        assert_eq!(StoreError::AppNotFound(app.clone()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::VersionNotFound(version.clone()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::AppNotInVersion { version, app }.kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn freeze_failures_classify_as_conflict() {
        let version = VersionName::new("r1").unwrap();
        assert_eq!(StoreError::VersionExists(version).kind(), ErrorKind::Conflict);
        assert_eq!(StoreError::EmptyRegistry.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn io_is_internal() {
        let err = StoreError::from(std::io::Error::other("disk on fire"));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn app_not_in_version_names_both() {
        let err = StoreError::AppNotInVersion {
            version: VersionName::new("rel1").unwrap(),
            app: AppName::new("calc").unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rel1"));
        assert!(msg.contains("calc"));
    }
}
