//! # Versions API
//!
//! Read-only listing of frozen versions.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use heleus_core::wire::{SnapshotResponse, VersionsResponse};
use heleus_core::VersionName;

use crate::error::AppError;
use crate::state::AppState;

/// Build the versions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/versions", get(list_versions))
        .route("/api/v1/versions/:version", get(get_version))
}

/// GET /api/v1/versions — All frozen versions, oldest first.
async fn list_versions(State(state): State<AppState>) -> Json<VersionsResponse> {
    Json(state.repository.list_versions())
}

/// GET /api/v1/versions/:version — One frozen version with its mapping.
async fn get_version(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Json<SnapshotResponse>, AppError> {
    let version = VersionName::new(version)?;
    Ok(Json(state.repository.get_version(&version)?))
}
