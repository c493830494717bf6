//! Heleus client error types.

use std::path::PathBuf;

use heleus_core::wire::ErrorResponse;
use heleus_core::ContentDigest;
use reqwest::StatusCode;

use crate::config::ConfigError;

/// Errors from repository calls and the local side of transfers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Unknown application, version or artifact.
    #[error("not found: {0}")]
    NotFound(String),
    /// The version name is already frozen.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The artifact or a name was rejected, locally or by the server.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    /// The local file to push does not exist.
    #[error("APK file '{}' not found", .0.display())]
    MissingFile(PathBuf),
    /// Connection or transfer failure.
    #[error("cannot reach server at {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The server answered with a status the client does not classify.
    #[error("server returned {status}: {message}")]
    Unknown { status: u16, message: String },
    /// A success response whose body did not match the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Downloaded bytes do not hash to the digest the server announced.
    #[error("download corrupted: expected {expected}, got {actual}")]
    Integrity {
        expected: ContentDigest,
        actual: ContentDigest,
    },
    /// A bundle entry whose name would escape the destination directory.
    #[error("bundle entry '{0}' has an unsafe path")]
    UnsafeEntry(String),
    #[error("bundle archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Classify a non-2xx response. The `error` field of the JSON body is
    /// the message; a body that is not an error document is used verbatim.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::BAD_REQUEST
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNPROCESSABLE_ENTITY => Self::InvalidArtifact(message),
            other => Self::Unknown {
                status: other.as_u16(),
                message,
            },
        }
    }
}
