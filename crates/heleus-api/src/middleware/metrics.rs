//! # Response Counters
//!
//! Counts every response the repository service sends and how many of
//! them carried a 4xx or 5xx status. `GET /api/v1/status` reports both.
//!
//! A response is counted once it has been produced, so the status
//! request that reads the counters is not part of its own figures.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Default)]
struct Counters {
    responses: AtomicU64,
    errors: AtomicU64,
}

/// Shared response counters, cloned into the middleware and `AppState`.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    counters: Arc<Counters>,
}

/// Counter values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub requests_served: u64,
    pub error_responses: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one response with `status`.
    pub fn record(&self, status: StatusCode) {
        self.counters.responses.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() || status.is_server_error() {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_served: self.counters.responses.load(Ordering::Relaxed),
            error_responses: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

/// Middleware recording the status of every response the router returns.
pub async fn count_responses(
    State(metrics): State<ApiMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    metrics.record(response.status());
    response
}
