//! Router behaviour against a mock upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use consignes_proxy::{ProxyConfig, ProxyState, X_CACHE, router};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{EXEC_PATH, TestHarness, get, json_body, post_json};

const FORM_URI: &str = "/api?token=t&action=form&date=2026-10-19&mode=daily";

fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": data }))
}

#[tokio::test]
async fn test_get_is_forwarded_with_query_then_cached() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path(EXEC_PATH))
        .and(query_param("token", "t"))
        .and(query_param("action", "form"))
        .and(query_param("date", "2026-10-19"))
        .respond_with(envelope(json!({ "questions": [] })))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let first = harness.send(get(FORM_URI)).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[X_CACHE], "MISS");
    assert_eq!(first.headers()["content-type"], "application/json");
    assert_eq!(json_body(first).await["data"]["questions"], json!([]));

    let second = harness.send(get(FORM_URI)).await;
    assert_eq!(second.headers()[X_CACHE], "HIT");
    assert_eq!(json_body(second).await["ok"], true);

    assert_eq!(harness.upstream_hits().await, 1);
}

#[tokio::test]
async fn test_cache_key_includes_query() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!([])))
        .expect(2)
        .mount(&harness.upstream)
        .await;

    harness.send(get("/api?action=consignes&token=a")).await;
    let other = harness.send(get("/api?action=consignes&token=b")).await;

    assert_eq!(other.headers()[X_CACHE], "MISS");
    assert_eq!(harness.state.cache().len(), 2);
}

#[tokio::test]
async fn test_upstream_errors_are_not_cached() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(2)
        .mount(&harness.upstream)
        .await;

    let first = harness.send(get(FORM_URI)).await;
    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);
    let second = harness.send(get(FORM_URI)).await;
    assert_eq!(second.headers()[X_CACHE], "MISS");
    assert!(harness.state.cache().is_empty());
}

#[tokio::test]
async fn test_post_bypasses_and_invalidates_cache() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!({ "questions": [] })))
        .expect(2)
        .mount(&harness.upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(EXEC_PATH))
        .and(query_param("token", "t"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "action": "save_answers", "answers": { "q1": true } })))
        .respond_with(envelope(json!({ "saved": 1 })))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    harness.send(get(FORM_URI)).await;
    assert_eq!(harness.state.cache().len(), 1);

    let saved = harness
        .send(post_json(
            "/api?token=t",
            json!({ "action": "save_answers", "answers": { "q1": true } }),
        ))
        .await;
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(saved.headers()[X_CACHE], "BYPASS");
    assert!(harness.state.cache().is_empty());

    let refreshed = harness.send(get(FORM_URI)).await;
    assert_eq!(refreshed.headers()[X_CACHE], "MISS");
}

#[tokio::test]
async fn test_failed_post_keeps_cache() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!([])))
        .mount(&harness.upstream)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.upstream)
        .await;

    harness.send(get("/api?action=consignes")).await;
    let failed = harness
        .send(post_json("/api", json!({ "action": "delete_consigne", "id": "c-1" })))
        .await;

    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.state.cache().len(), 1);
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let harness = TestHarness::new().await;
    let request = Request::delete("/api?action=consignes")
        .body(Body::empty())
        .unwrap();

    let response = harness.send(request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["ok"], false);
    assert_eq!(harness.upstream_hits().await, 0);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let config = ProxyConfig {
        upstream: "http://127.0.0.1:9/exec".to_string(),
        timeout_secs: 2,
        ..ProxyConfig::default()
    };
    let state = Arc::new(ProxyState::new(&config).unwrap());

    let response = router(state).oneshot(get(FORM_URI)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("Upstream"));
}

#[tokio::test]
async fn test_healthz_reports_cache_size() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!([])))
        .mount(&harness.upstream)
        .await;
    harness.send(get("/api?action=consignes")).await;

    let response = harness.send(get("/healthz")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cached"], 1);
    assert_eq!(body["upstream"], "127.0.0.1");
}

#[tokio::test]
async fn test_read_overlapping_a_write_is_not_cached() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!({ "questions": [] })).set_delay(Duration::from_millis(300)))
        .mount(&harness.upstream)
        .await;
    Mock::given(method("POST"))
        .respond_with(envelope(json!({ "saved": 1 })))
        .mount(&harness.upstream)
        .await;

    let slow_read = tokio::spawn(harness.app().oneshot(get(FORM_URI)));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let saved = harness
        .send(post_json("/api", json!({ "action": "save_answers", "answers": { "q1": true } })))
        .await;
    assert_eq!(saved.status(), StatusCode::OK);

    let read = slow_read.await.unwrap().unwrap();
    assert_eq!(read.status(), StatusCode::OK);
    assert_eq!(read.headers()[X_CACHE], "MISS");
    assert!(harness.state.cache().is_empty());

    let next = harness.send(get(FORM_URI)).await;
    assert_eq!(next.headers()[X_CACHE], "MISS");
}

#[tokio::test]
async fn test_upstream_query_is_kept_alongside_request_query() {
    let harness = TestHarness::configured("?deployment=a", 5).await;
    Mock::given(method("GET"))
        .and(path(EXEC_PATH))
        .and(query_param("deployment", "a"))
        .and(query_param("action", "consignes"))
        .and(query_param("token", "t"))
        .respond_with(envelope(json!([])))
        .expect(1)
        .mount(&harness.upstream)
        .await;
    Mock::given(method("POST"))
        .and(query_param("deployment", "a"))
        .respond_with(envelope(json!({ "saved": 0 })))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let listed = harness.send(get("/api?action=consignes&token=t")).await;
    assert_eq!(listed.status(), StatusCode::OK);

    let saved = harness
        .send(post_json("/api", json!({ "action": "save_answers", "answers": {} })))
        .await;
    assert_eq!(saved.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_slow_upstream_is_gateway_timeout() {
    let harness = TestHarness::configured("", 1).await;
    Mock::given(method("GET"))
        .respond_with(envelope(json!([])).set_delay(Duration::from_secs(3)))
        .mount(&harness.upstream)
        .await;

    let response = harness.send(get(FORM_URI)).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = json_body(response).await;
    assert_eq!(body["ok"], false);
    assert!(harness.state.cache().is_empty());
}
