// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /companion/assist, GET /health, and GET /metrics.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hachi_core::api::AssistRequest;
use hachi_core::ProcessingTier;
use serde::Serialize;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway started.
    pub uptime_secs: u64,
    /// Tier wire name to its `enabled` flag.
    pub tiers: BTreeMap<String, bool>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// POST /companion/assist
///
/// Runs the request through the routing pipeline. Tier failures still yield
/// 200 with the fallback apology; only a broken cascade wiring is a 500.
pub async fn post_assist(
    State(state): State<GatewayState>,
    Json(body): Json<AssistRequest>,
) -> Response {
    let request = body.into_companion_request();
    let request_id = request.request_id.clone();

    match state.handler.handle(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            tracing::error!(request_id = request_id.as_str(), error = %err, "assist request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
///
/// Returns liveness plus which tiers are switched on.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let registry = state.handler.registry();
    let tiers = ProcessingTier::ALL
        .into_iter()
        .map(|tier| (tier.to_string(), registry.is_enabled(tier)))
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        tiers,
    })
}

/// GET /metrics
///
/// Prometheus text format, or 404 when metrics are switched off.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.metrics_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes_camel_case() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            tiers: BTreeMap::from([("rule".to_string(), true), ("tier_3".to_string(), false)]),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptimeSecs\":42"));
        assert!(json.contains("\"tier_3\":false"));
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "unknown processing tier: tier_1".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("unknown processing tier"));
    }
}
