//! # heleus-server — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Heleus repository.
//! Configuration comes from the environment (see [`AppConfig::from_env`]).

use anyhow::Context;
use heleus_api::state::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing. HELEUS_LOG_FORMAT=json switches to JSON lines.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("HELEUS_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().context("invalid server configuration")?;
    tracing::info!(?config, "configuration loaded");

    let addr = std::net::SocketAddr::new(config.host, config.port);
    let state = AppState::open(config).map_err(|e| {
        tracing::error!("Repository initialization failed: {e}");
        e
    })?;

    let app = heleus_api::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!("Heleus repository listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested, draining in-flight requests"),
        Err(e) => {
            tracing::error!("cannot listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
