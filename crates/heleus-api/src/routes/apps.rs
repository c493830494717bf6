//! # Applications API

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use heleus_core::wire::{AppHistoryResponse, AppsResponse};

use crate::state::AppState;

/// Build the applications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/apps", get(list_apps))
        .route("/api/v1/apps/all", get(list_all))
}

/// GET /api/v1/apps — Latest state of every application.
async fn list_apps(State(state): State<AppState>) -> Json<AppsResponse> {
    Json(state.repository.list_apps())
}

/// GET /api/v1/apps/all — Every application with its push history.
async fn list_all(State(state): State<AppState>) -> Json<AppHistoryResponse> {
    Json(state.repository.list_all())
}
