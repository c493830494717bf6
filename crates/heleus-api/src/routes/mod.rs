//! # API Route Modules
//!
//! - `status` — liveness and repository counters.
//! - `push` — multipart artifact upload.
//! - `pull` — single-artifact and bundle downloads.
//! - `freeze` — snapshot creation.
//! - `versions` — frozen version listing and detail.
//! - `apps` — application listing with and without history.

pub mod apps;
pub mod freeze;
pub mod pull;
pub mod push;
pub mod status;
pub mod versions;

use axum::http::HeaderValue;

use crate::error::AppError;

/// Build a header value that may carry non-ASCII names.
pub(crate) fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_bytes(value.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid header value {value:?}: {e}")))
}

/// `attachment; filename="..."` with quotes and backslashes escaped.
pub(crate) fn attachment(filename: &str) -> Result<HeaderValue, AppError> {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    header_value(&format!("attachment; filename=\"{escaped}\""))
}
