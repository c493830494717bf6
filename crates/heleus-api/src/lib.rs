//! # heleus-api — Heleus Repository Service
//!
//! HTTP front end of the Heleus repository: clients push APKs, pull the
//! latest or a frozen version of one application or of every application
//! as a zip bundle, and freeze the current state under a version name.
//!
//! ## API Surface
//!
//! | Route                                   | Module               |
//! |-----------------------------------------|----------------------|
//! | `GET  /api/v1/status`                   | [`routes::status`]   |
//! | `POST /api/v1/push`                     | [`routes::push`]     |
//! | `GET  /api/v1/pull[/:version[/:app]]`   | [`routes::pull`]     |
//! | `GET  /api/v1/freeze/:version`          | [`routes::freeze`]   |
//! | `GET  /api/v1/versions[/:version]`      | [`routes::versions`] |
//! | `GET  /api/v1/apps`, `/api/v1/apps/all` | [`routes::apps`]     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod bundle;
pub mod error;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;

use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();
    let max_artifact_bytes = state.repository.max_artifact_bytes();

    Router::new()
        .merge(routes::status::router())
        .merge(routes::push::router(max_artifact_bytes))
        .merge(routes::pull::router())
        .merge(routes::freeze::router())
        .merge(routes::versions::router())
        .merge(routes::apps::router())
        .layer(from_fn_with_state(
            metrics,
            middleware::metrics::count_responses,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
