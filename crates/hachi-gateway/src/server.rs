// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use hachi_core::HachiError;
use hachi_router::RequestHandler;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Renders the current metrics in Prometheus text format.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The routing pipeline.
    pub handler: Arc<RequestHandler>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional render function for GET /metrics.
    pub metrics_render: Option<MetricsRender>,
}

impl GatewayState {
    pub fn new(handler: Arc<RequestHandler>) -> Self {
        Self {
            handler,
            start_time: Instant::now(),
            metrics_render: None,
        }
    }

    /// Serve `render()` output on GET /metrics.
    pub fn with_metrics_render(mut self, render: MetricsRender) -> Self {
        self.metrics_render = Some(render);
        self
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("start_time", &self.start_time)
            .field("metrics_render", &self.metrics_render.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

/// Gateway listener settings (mirrors `GatewayConfig` from hachi-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the application router.
///
/// Routes:
/// - POST /companion/assist
/// - GET /health
/// - GET /metrics (404 unless a render function is set)
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/companion/assist", post(handlers::post_assist))
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HachiError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HachiError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| HachiError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
