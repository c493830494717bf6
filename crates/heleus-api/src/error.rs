//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps storage and validation errors to HTTP status codes and renders
//! every failure as `{"error": "...", "code": "..."}`. Internal error
//! details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use heleus_core::wire::ErrorResponse;
use heleus_core::ValidationError;
use heleus_store::{ErrorKind, StoreError};
use thiserror::Error;

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown application, version, or artifact (404).
    #[error("{0}")]
    NotFound(String),

    /// Frozen version name already taken (409).
    #[error("{0}")]
    Conflict(String),

    /// Freeze requested with no applications pushed (409).
    #[error("{0}")]
    EmptyRegistry(String),

    /// Upload rejected: empty, oversize, or not an APK (422).
    #[error("{0}")]
    InvalidArtifact(String),

    /// A name in the request path broke the naming rules (422).
    #[error("{0}")]
    Validation(String),

    /// Malformed request, e.g. a broken multipart body (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::EmptyRegistry(_) => (StatusCode::CONFLICT, "EMPTY_REGISTRY"),
            Self::InvalidArtifact(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_ARTIFACT"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorResponse {
            error: message,
            code: Some(code.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::NotAnApk(_) => Self::InvalidArtifact(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyRegistry => Self::EmptyRegistry(err.to_string()),
            StoreError::InvalidName(inner) => Self::from(inner),
            other => match other.kind() {
                ErrorKind::NotFound => Self::NotFound(other.to_string()),
                ErrorKind::Conflict => Self::Conflict(other.to_string()),
                ErrorKind::InvalidArtifact => Self::InvalidArtifact(other.to_string()),
                ErrorKind::Internal => Self::Internal(other.to_string()),
            },
        }
    }
}
