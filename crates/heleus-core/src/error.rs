//! # Validation Errors
//!
//! Errors raised when constructing core types from untrusted input
//! (request paths, uploaded filenames, digests read off the wire).

use thiserror::Error;

/// Input failed validation while constructing a core type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A content digest was not 64 hex characters.
    #[error("invalid content digest: {0}")]
    InvalidDigest(String),

    /// An application name broke the naming rules.
    #[error("invalid application name {name:?}: {reason}")]
    InvalidAppName { name: String, reason: String },

    /// A version name broke the naming rules.
    #[error("invalid version name {name:?}: {reason}")]
    InvalidVersionName { name: String, reason: String },

    /// An uploaded filename was not an `.apk`.
    #[error("file must be an APK: {0:?}")]
    NotAnApk(String),
}
