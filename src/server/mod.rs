//! HTTP API surface.
//!
//! The axum router over the aggregation engine. The edge concerns the
//! service does not own (CORS policy, rate limiting, static assets, the
//! domain resolver) are expected in front of or beside this process.

mod error;
mod handlers;
mod state;

pub use error::ApiError;
pub use state::AppState;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;

use crate::config::Config;
use handlers::{
    ai_analysis_handler, check_exits_batch_stream_handler, check_exits_handler, check_handler,
    check_ip_batch_stream_handler, check_ip_detail_handler, config_handler, exit_detail_handler,
    health_handler, health_live_handler, health_ready_handler, prepare_exits_handler,
};

/// Builds the API router over prepared state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(config_handler))
        .route("/api/check", get(check_handler))
        .route("/api/check-ip/detail", post(check_ip_detail_handler))
        .route(
            "/api/check-ip/batch-stream",
            post(check_ip_batch_stream_handler),
        )
        .route("/api/check-exits", post(check_exits_handler))
        .route("/api/check-exits/prepare", post(prepare_exits_handler))
        .route("/api/check-exits/detail", post(exit_detail_handler))
        .route(
            "/api/check-exits/batch-stream",
            post(check_exits_batch_stream_handler),
        )
        .route("/api/ai-analysis", post(ai_analysis_handler))
        .route("/api/health", get(health_handler))
        .route("/api/health/live", get(health_live_handler))
        .route("/api/health/ready", get(health_ready_handler))
        .with_state(state)
}

/// Builds the engine from `config` and serves the API on `port`.
pub async fn run_server(config: Config, port: u16) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind API server to port {port}"))?;
    log::info!("API server listening on http://0.0.0.0:{port}/api/");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("API server error")?;

    Ok(())
}
