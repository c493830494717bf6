//! # Pull API
//!
//! - `GET /api/v1/pull` — bundle of every application at latest.
//! - `GET /api/v1/pull/:version` — bundle at a frozen version (or `latest`).
//! - `GET /api/v1/pull/:version/:app_name` — one artifact.
//!
//! Bodies are streamed from disk. Single artifacts carry their digest in
//! `X-Content-Hash` so the client can verify what it wrote.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, Response};
use axum::routing::get;
use axum::Router;
use heleus_core::wire::{APK_MIME, CONTENT_HASH_HEADER};
use heleus_core::{AppName, VersionSelector};
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::routes::{attachment, header_value};
use crate::state::AppState;

/// Build the pull router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/pull", get(pull_latest_bundle))
        .route("/api/v1/pull/:version", get(pull_bundle))
        .route("/api/v1/pull/:version/:app_name", get(pull_artifact))
}

/// GET /api/v1/pull — Bundle of every application's latest artifact.
async fn pull_latest_bundle(State(state): State<AppState>) -> Result<Response<Body>, AppError> {
    bundle_response(&state, VersionSelector::Latest).await
}

/// GET /api/v1/pull/:version — Bundle at a version.
async fn pull_bundle(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Response<Body>, AppError> {
    let version = VersionSelector::parse(&version)?;
    bundle_response(&state, version).await
}

/// GET /api/v1/pull/:version/:app_name — One application's artifact at a version.
async fn pull_artifact(
    State(state): State<AppState>,
    Path((version, app_name)): Path<(String, String)>,
) -> Result<Response<Body>, AppError> {
    let version = VersionSelector::parse(&version)?;
    let app = AppName::new(app_name)?;
    let download = state.repository.pull_artifact(&version, &app).await?;
    let artifact = download.artifact.artifact;

    tracing::debug!(app = %app, version = %version, hash = %artifact.digest, "serving artifact");
    Response::builder()
        .header(header::CONTENT_TYPE, APK_MIME)
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .header(
            header::CONTENT_DISPOSITION,
            attachment(&app.artifact_filename())?,
        )
        .header(
            HeaderName::from_static(CONTENT_HASH_HEADER),
            header_value(&artifact.digest.to_hex())?,
        )
        .body(Body::from_stream(ReaderStream::new(download.artifact.file)))
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))
}

async fn bundle_response(
    state: &AppState,
    version: VersionSelector,
) -> Result<Response<Body>, AppError> {
    let download = state.repository.pull_bundle(&version).await?;
    let file = tokio::fs::File::from_std(download.bundle.file);

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, download.bundle.size_bytes)
        .header(
            header::CONTENT_DISPOSITION,
            attachment(&format!("heleus-{version}.zip"))?,
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))
}
