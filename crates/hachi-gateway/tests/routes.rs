// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hachi_config::HachiConfig;
use hachi_context::{ConversationManager, MemoryStore};
use hachi_core::api::response_schema;
use hachi_core::ProcessingTier;
use hachi_gateway::{router, GatewayState};
use hachi_router::{CascadeController, ProcessorRegistry, RequestHandler, ResponseFormatter};
use hachi_test_utils::TestHarness;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_from_harness(harness: &TestHarness) -> Router {
    router(GatewayState::new(Arc::clone(&harness.handler)))
}

fn assist(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/companion/assist")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn assist_returns_formatted_response() {
    let harness = TestHarness::builder().build();
    let app = app_from_harness(&harness);

    let response = app
        .oneshot(assist(json!({
            "playerId": "p1",
            "sessionId": "s1",
            "gameContext": { "location": "station_entrance" },
            "request": { "type": "assistance", "text": "How do I say ticket in Japanese?" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["meta"]["processingTier"], "tier_1");
    assert_eq!(body["dialogue"]["characterName"], "Hachi");
    assert!(body["dialogue"]["text"].as_str().unwrap().contains("means"));

    let validator = jsonschema::validator_for(&response_schema()).unwrap();
    assert!(validator.is_valid(&body), "{body:#}");
}

#[tokio::test]
async fn all_tiers_disabled_is_still_200() {
    let mut builder = TestHarness::builder();
    for tier in ProcessingTier::ALL {
        builder = builder.disable_tier(tier);
    }
    let harness = builder.build();

    let response = app_from_harness(&harness)
        .oneshot(assist(json!({
            "playerId": "p1",
            "sessionId": "s1",
            "request": { "type": "hint", "text": "help" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["dialogue"]["text"],
        "I'm sorry, I encountered an error while processing your request. Please try again."
    );
    assert_eq!(body["meta"]["processingTier"], "rule");
}

#[tokio::test]
async fn missing_fields_are_rejected_with_422() {
    let harness = TestHarness::builder().build();
    let response = app_from_harness(&harness)
        .oneshot(assist(json!({ "playerId": "p1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unregistered_tier_is_500_with_error_body() {
    let handler = RequestHandler::new(
        CascadeController::new(Arc::new(ProcessorRegistry::new()), &HachiConfig::default()),
        ConversationManager::new(Arc::new(MemoryStore::new()), 10),
        ResponseFormatter::new("Hachi"),
        "beginner",
    );
    let app = router(GatewayState::new(Arc::new(handler)));

    let response = app
        .oneshot(assist(json!({
            "playerId": "p1",
            "sessionId": "s1",
            "request": { "type": "hint", "text": "help" }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("unknown processing tier"));
}

#[tokio::test]
async fn health_reports_tier_switches() {
    let harness = TestHarness::builder().disable_tier(ProcessingTier::Tier3).build();
    let response = app_from_harness(&harness)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["uptimeSecs"].is_u64());
    assert_eq!(body["tiers"]["rule"], true);
    assert_eq!(body["tiers"]["tier_1"], true);
    assert_eq!(body["tiers"]["tier_2"], true);
    assert_eq!(body["tiers"]["tier_3"], false);
}

#[tokio::test]
async fn metrics_is_404_without_a_recorder() {
    let harness = TestHarness::builder().build();
    let response = app_from_harness(&harness)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_serves_rendered_text() {
    let harness = TestHarness::builder().build();
    let state = GatewayState::new(Arc::clone(&harness.handler))
        .with_metrics_render(Arc::new(|| "hachi_requests_total{intent=\"general_hint\"} 3\n".to_string()));

    let response = router(state)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hachi_requests_total{intent=\"general_hint\"} 3\n");
}
