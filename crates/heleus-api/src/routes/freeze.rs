//! # Freeze API
//!
//! Captures every application's latest artifact under a new, immutable
//! version name. Reusing a name is a 409, never an overwrite.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use heleus_core::wire::FreezeResponse;
use heleus_core::VersionName;

use crate::error::AppError;
use crate::state::AppState;

/// Build the freeze router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/freeze/:version", get(freeze))
}

/// GET /api/v1/freeze/:version — Freeze the current registry state.
async fn freeze(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Json<FreezeResponse>, AppError> {
    let version = VersionName::new(version)?;
    Ok(Json(state.repository.freeze(version).await?))
}
