//! API Integration Tests
//!
//! These tests drive the full application router (REST API, WebSocket upgrade
//! route and health check) with real in-process state via
//! `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use tablecast::server::{build_router, HttpServerState};
use tablecast::{SubscriptionHub, TableStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    router: Router,
    hub: Arc<SubscriptionHub>,
}

fn create_test_app_with(broadcast_http_writes: bool, max_body_bytes: usize) -> TestApp {
    let store = Arc::new(TableStore::in_memory());
    let hub = Arc::new(SubscriptionHub::new());
    let router = build_router(HttpServerState {
        store,
        hub: hub.clone(),
        broadcast_http_writes,
        max_body_bytes,
    });
    TestApp { router, hub }
}

fn create_test_app() -> Router {
    create_test_app_with(false, 1024 * 1024).router
}

fn basic(user: &str, secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", user, secret)))
}

/// Send a request and return (status, body text).
async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// Send a GET request and return (status, body text).
async fn get_request(app: Router, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// Send a raw-body POST request and return (status, body text).
async fn post_value(
    app: Router,
    uri: &str,
    value: &str,
    auth: Option<&str>,
) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/plain");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    send(app, builder.body(Body::from(value.to_string())).unwrap()).await
}

/// Send a DELETE request and return (status, body text).
async fn delete_request(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

// ---------------------------------------------------------------------------
// Key operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_set_get_delete_roundtrip() {
    let app = create_test_app();

    let (status, body) = post_value(app.clone(), "/api/shop/prices/apple", "1.50", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "SET: apple");

    let (status, body) = get_request(app.clone(), "/api/shop/prices/apple", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1.50");

    let (status, body) = delete_request(app.clone(), "/api/shop/prices/apple").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Deleted apple");

    let (status, body) = get_request(app, "/api/shop/prices/apple", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
}

#[tokio::test]
async fn test_missing_key_returns_empty_body() {
    let app = create_test_app();
    let (status, body) = get_request(app, "/api/shop/prices/nothing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_delete_absent_key_succeeds() {
    let app = create_test_app();
    let (status, body) = delete_request(app, "/api/shop/prices/ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Deleted ghost");
}

#[tokio::test]
async fn test_overwrite_keeps_last_value() {
    let app = create_test_app();
    post_value(app.clone(), "/api/shop/prices/apple", "1.50", None).await;
    post_value(app.clone(), "/api/shop/prices/apple", "1.75", None).await;

    let (_, body) = get_request(app, "/api/shop/prices/apple", None).await;
    assert_eq!(body, "1.75");
}

#[tokio::test]
async fn test_value_body_is_stored_verbatim() {
    let app = create_test_app();
    let value = "  spaced  out\nmulti-line {\"json\": true}  ";
    post_value(app.clone(), "/api/notes/daily/today", value, None).await;

    let (_, body) = get_request(app, "/api/notes/daily/today", None).await;
    assert_eq!(body, value);
}

// ---------------------------------------------------------------------------
// Table operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_table_returns_document() {
    let app = create_test_app();
    post_value(app.clone(), "/api/shop/prices/apple", "1.50", None).await;
    post_value(app.clone(), "/api/shop/prices/pear", "2.00", None).await;

    let (status, body) = get_request(app, "/api/shop/prices", None).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"data": {"apple": "1.50", "pear": "2.00"}})
    );
}

#[tokio::test]
async fn test_get_new_table_is_empty_document() {
    let app = create_test_app();
    let (status, body) = get_request(app, "/api/fresh/table", None).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, serde_json::json!({"data": {}}));
}

#[tokio::test]
async fn test_tables_are_independent() {
    let app = create_test_app();
    post_value(app.clone(), "/api/shop/prices/apple", "1.50", None).await;

    let (_, body) = get_request(app.clone(), "/api/shop/stock/apple", None).await;
    assert_eq!(body, "");
    let (_, body) = get_request(app, "/api/other/prices/apple", None).await;
    assert_eq!(body, "");
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_credentials_isolate_tenants() {
    let app = create_test_app();
    let alice = basic("alice", "wonderland");
    let bob = basic("bob", "builder");

    post_value(app.clone(), "/api/shop/prices/apple", "alice", Some(&alice)).await;
    post_value(app.clone(), "/api/shop/prices/apple", "bob", Some(&bob)).await;
    post_value(app.clone(), "/api/shop/prices/apple", "anon", None).await;

    let (_, body) = get_request(app.clone(), "/api/shop/prices/apple", Some(&alice)).await;
    assert_eq!(body, "alice");
    let (_, body) = get_request(app.clone(), "/api/shop/prices/apple", Some(&bob)).await;
    assert_eq!(body, "bob");
    let (_, body) = get_request(app.clone(), "/api/shop/prices/apple", None).await;
    assert_eq!(body, "anon");

    // Same user, different secret is a different tenant.
    let other = basic("alice", "elsewhere");
    let (_, body) = get_request(app, "/api/shop/prices/apple", Some(&other)).await;
    assert_eq!(body, "");
}

#[tokio::test]
async fn test_malformed_credentials_are_rejected() {
    let app = create_test_app();
    let (status, body) = get_request(app, "/api/shop/prices/apple", Some("Bearer xyz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "INVALID_CREDENTIALS");
    assert!(json["hint"].is_string());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_invalid_table_name_is_bad_request() {
    let app = create_test_app();
    let (status, body) = get_request(app, "/api/shop/..", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "INVALID_NAME");
}

#[tokio::test]
async fn test_encoded_separator_in_name_is_rejected() {
    let app = create_test_app();
    let (status, _) = post_value(app, "/api/shop/a%2Fb/apple", "1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_limit() {
    let app = create_test_app_with(false, 16).router;
    let (status, _) = post_value(app.clone(), "/api/shop/prices/big", &"x".repeat(64), None).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = post_value(app, "/api/shop/prices/small", "tiny", None).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Broadcast of REST writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_http_writes_not_broadcast_by_default() {
    let TestApp { router, hub } = create_test_app_with(false, 1024);
    let (sub, mut mailbox) = hub.new_subscriber();
    hub.subscribe("default/shop/prices", sub);

    post_value(router, "/api/shop/prices/apple", "1.50", None).await;
    assert!(mailbox.try_recv().is_none());
}

#[tokio::test]
async fn test_http_writes_broadcast_when_enabled() {
    let TestApp { router, hub } = create_test_app_with(true, 1024);
    let (sub, mut mailbox) = hub.new_subscriber();
    hub.subscribe("default/shop/prices", sub);

    post_value(router.clone(), "/api/shop/prices/apple", "1.50", None).await;
    assert_eq!(mailbox.try_recv().as_deref(), Some("UPDATE: apple: 1.50"));

    // Deletes are never broadcast.
    delete_request(router, "/api/shop/prices/apple").await;
    assert!(mailbox.try_recv().is_none());
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    post_value(app.clone(), "/api/shop/prices/apple", "1.50", None).await;

    let (status, body) = get_request(app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["tables_tracked"], 1);
    assert_eq!(json["subscribers"], 0);
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let app = create_test_app();
    let (status, _) = get_request(app, "/ws/shop/prices", None).await;
    assert!(status.is_client_error());
}
