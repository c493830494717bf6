//! # Status API
//!
//! Liveness check. Succeeds whenever the service is reachable.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use heleus_core::wire::StatusResponse;

use crate::state::AppState;

/// Build the status router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/status", get(status))
}

/// GET /api/v1/status — Liveness plus repository counters.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.repository.stats();
    let served = state.metrics.snapshot();
    Json(StatusResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        apps: stats.apps,
        frozen_versions: stats.frozen_versions,
        requests_served: served.requests_served,
        error_responses: served.error_responses,
    })
}
