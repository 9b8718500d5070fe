// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP integration tests: routes, envelope shape, auth, and error
//! status mapping, driven through the router with tower's oneshot.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tidings_config::model::GatewayConfig;
use tidings_gateway::{AppState, build_router};
use tidings_test_utils::TestHarness;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn test_router() -> Router {
    let harness = TestHarness::builder()
        .with_search_results(5)
        .build()
        .await
        .unwrap();
    let state = AppState::new(
        harness.orchestrator.clone(),
        harness.dialogue.clone(),
        harness.memory.clone(),
        harness.adapters.clone(),
    );
    let config = GatewayConfig {
        bearer_token: Some(TOKEN.to_string()),
        ..GatewayConfig::default()
    };
    build_router(state, &config)
}

fn authed(request: Request<Body>) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {TOKEN}").parse().unwrap(),
    );
    Request::from_parts(parts, body)
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public_and_reports_providers() {
    let router = test_router().await;
    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let providers = json["data"]["providers"].as_array().unwrap();
    assert!(providers.len() >= 3);
    assert!(providers.iter().any(|p| p["name"] == "store"));
}

#[tokio::test]
async fn api_routes_reject_missing_or_wrong_token() {
    let router = test_router().await;
    let unauthenticated = router
        .clone()
        .oneshot(json_post(
            "/pipeline/process",
            serde_json::json!({"query": "quantum"}),
        ))
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = json_post("/pipeline/process", serde_json::json!({"query": "q"}));
    wrong
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer nope".parse().unwrap());
    let response = router.oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pipeline_process_returns_the_run_inline() {
    let router = test_router().await;
    let response = router
        .clone()
        .oneshot(authed(json_post(
            "/pipeline/process",
            serde_json::json!({"query": "quantum computing", "user_id": "u1"}),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "success");
    assert_eq!(json["data"]["counts"]["found"], 5);
    let run_id = json["data"]["run_id"].as_str().unwrap().to_string();

    // The run is retrievable by id.
    let status_response = router
        .oneshot(authed(
            Request::builder()
                .uri(format!("/pipeline/status/{run_id}"))
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(status_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_run_maps_to_404_with_taxonomy_kind() {
    let router = test_router().await;
    let response = router
        .oneshot(authed(
            Request::builder()
                .uri("/pipeline/status/no-such-run")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "not_found");
}

#[tokio::test]
async fn chat_round_trip_and_history_listing() {
    let router = test_router().await;
    let chat_response = router
        .clone()
        .oneshot(authed(json_post(
            "/chat",
            serde_json::json!({"user_id": "u1", "message": "what is new?"}),
        )))
        .await
        .unwrap();
    assert_eq!(chat_response.status(), StatusCode::OK);
    let json = body_json(chat_response).await;
    let session_id = json["data"]["session_id"].as_str().unwrap().to_string();
    assert!(json["data"]["reply"].as_str().unwrap().len() > 0);

    let history = router
        .clone()
        .oneshot(authed(
            Request::builder()
                .uri(format!("/chat/{session_id}?limit=1"))
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    let json = body_json(history).await;
    let messages = json["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1, "limit applies");
    assert_eq!(messages[0]["role"], "assistant", "newest first");

    let deleted = router
        .oneshot(authed(
            Request::builder()
                .method("DELETE")
                .uri(format!("/chat/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
}

#[tokio::test]
async fn profile_read_update_and_memory_clear() {
    let router = test_router().await;

    let profile = router
        .clone()
        .oneshot(authed(
            Request::builder()
                .uri("/user/u1/profile")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(profile.status(), StatusCode::OK);

    let updated = router
        .clone()
        .oneshot(authed(
            Request::builder()
                .method("PUT")
                .uri("/user/u1/profile")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "response_length": "long",
                        "formality": "formal",
                        "detail_depth": "deep",
                        "personalization_level": 0.8
                    })
                    .to_string(),
                ))
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let json = body_json(updated).await;
    assert_eq!(json["data"]["style"]["response_length"], "long");

    let interaction = router
        .clone()
        .oneshot(authed(json_post(
            "/user/u1/interaction",
            serde_json::json!({"kind": "like", "text": "quantum chips"}),
        )))
        .await
        .unwrap();
    assert_eq!(interaction.status(), StatusCode::OK);

    let cleared = router
        .oneshot(authed(
            Request::builder()
                .method("DELETE")
                .uri("/user/u1/memory")
                .body(Body::empty())
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
}

#[tokio::test]
async fn out_of_range_personalization_is_a_400() {
    let router = test_router().await;
    let response = router
        .oneshot(authed(
            Request::builder()
                .method("PUT")
                .uri("/user/u1/profile")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "response_length": "long",
                        "formality": "formal",
                        "detail_depth": "deep",
                        "personalization_level": 1.8
                    })
                    .to_string(),
                ))
                .unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["kind"], "config");
}

#[tokio::test]
async fn quick_pipeline_skips_persistence() {
    let router = test_router().await;
    let response = router
        .oneshot(authed(json_post(
            "/pipeline/quick",
            serde_json::json!({"query": "quantum computing"}),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["counts"]["stored"], 0);
    assert!(json["data"]["counts"]["cards"].as_u64().unwrap() > 0);
}
