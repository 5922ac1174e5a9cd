//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use kv_cache::{api::create_router, clock::ManualClock, AppState, CacheEngine};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::with_engine(CacheEngine::with_capacity(100).unwrap()))
}

fn create_app_with_clock(capacity: usize) -> (Router, ManualClock) {
    let clock = ManualClock::new();
    let engine = CacheEngine::with_clock(capacity, Arc::new(clock.clone())).unwrap();
    (create_router(AppState::with_engine(engine)), clock)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key":"test_key","value":"test_value"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_negative_ttl_is_bad_request() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"k","value":"v","ttl_ms":-10}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("negative"));
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let (status, json) = send(&app, "PUT", "/set", Some(r#"{"key":"","value":"v"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let (status, _) = send(&app, "PUT", "/set", Some("{not json")).await;

    assert!(status.is_client_error());
}

// == GET / EXISTS / DELETE Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"get_key","value":"get_value"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/get/get_key", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/get/nonexistent_key", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent_key"));
}

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"delete_key","value":"delete_value"}"#),
    )
    .await;

    let (status, _) = send(&app, "DELETE", "/del/delete_key", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/delete_key", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_absent_key_succeeds() {
    let app = create_test_app();

    let (status, _) = send(&app, "DELETE", "/del/nonexistent_key", None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_exists_endpoint() {
    let app = create_test_app();

    let (_, json) = send(&app, "GET", "/exists/k", None).await;
    assert_eq!(json["exists"], false);

    send(&app, "PUT", "/set", Some(r#"{"key":"k","value":"v"}"#)).await;

    let (status, json) = send(&app, "GET", "/exists/k", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exists"], true);
}

// == TTL and Eviction ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let (app, clock) = create_app_with_clock(100);

    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"short","value":"lived","ttl_ms":100}"#),
    )
    .await;

    let (_, json) = send(&app, "GET", "/exists/short", None).await;
    assert_eq!(json["exists"], true);

    clock.advance(Duration::from_millis(150));

    let (_, json) = send(&app, "GET", "/exists/short", None).await;
    assert_eq!(json["exists"], false);
    let (status, _) = send(&app, "GET", "/get/short", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lru_eviction_via_api() {
    let (app, _) = create_app_with_clock(2);

    send(&app, "PUT", "/set", Some(r#"{"key":"a","value":"1"}"#)).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"b","value":"2"}"#)).await;
    send(&app, "GET", "/get/a", None).await;
    send(&app, "PUT", "/set", Some(r#"{"key":"c","value":"3"}"#)).await;

    let (_, a) = send(&app, "GET", "/exists/a", None).await;
    let (_, b) = send(&app, "GET", "/exists/b", None).await;
    let (_, c) = send(&app, "GET", "/exists/c", None).await;
    assert_eq!(a["exists"], true);
    assert_eq!(b["exists"], false);
    assert_eq!(c["exists"], true);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["evictions"], 1);
    assert_eq!(stats["total_entries"], 2);
}

// == STATS / HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"s","value":"v"}"#)).await;
    send(&app, "GET", "/get/s", None).await;
    send(&app, "GET", "/get/missing", None).await;

    let (status, json) = send(&app, "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
}

// == User Endpoint Tests ==

#[tokio::test]
async fn test_user_lifecycle() {
    let app = create_test_app();
    let user = r#"{"name":"John Doe","email":"john@example.com"}"#;

    let (status, json) = send(&app, "PUT", "/users/123", Some(user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "user:123");

    let (status, json) = send(&app, "GET", "/users/123", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "John Doe");

    // users live in the shared keyspace
    let (_, json) = send(&app, "GET", "/exists/user:123", None).await;
    assert_eq!(json["exists"], true);

    let (status, _) = send(&app, "DELETE", "/users/123", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/users/123", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_expires_after_default_ttl() {
    let (app, clock) = create_app_with_clock(10);

    send(&app, "PUT", "/users/9", Some(r#"{"name":"Ada"}"#)).await;

    clock.advance(Duration::from_secs(3599));
    let (status, _) = send(&app, "GET", "/users/9", None).await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(Duration::from_secs(1));
    let (status, _) = send(&app, "GET", "/users/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
