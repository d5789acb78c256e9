//! Shared harness: a mock upstream and a proxy in front of it.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use consignes_proxy::{ProxyConfig, ProxyState, router};
use tower::ServiceExt;
use wiremock::MockServer;

/// Path the mock upstream serves.
pub const EXEC_PATH: &str = "/macros/s/test/exec";

/// Mock upstream plus the proxy state pointed at it.
pub struct TestHarness {
    /// The mock upstream
    pub upstream: MockServer,
    /// Proxy state shared with the router
    pub state: Arc<ProxyState>,
}

impl TestHarness {
    /// Starts an upstream and a proxy with a 60 s cache.
    pub async fn new() -> Self {
        Self::configured("", 5).await
    }

    /// Like [`new`](Self::new), with `suffix` appended to the upstream URL
    /// and the given upstream timeout.
    pub async fn configured(suffix: &str, timeout_secs: u64) -> Self {
        let upstream = MockServer::start().await;
        let config = ProxyConfig {
            upstream: format!("{}{EXEC_PATH}{suffix}", upstream.uri()),
            timeout_secs,
            ..ProxyConfig::default()
        };
        let state = Arc::new(ProxyState::new(&config).unwrap());
        Self { upstream, state }
    }

    /// A fresh router over the shared state.
    pub fn app(&self) -> Router {
        router(self.state.clone())
    }

    /// Sends one request through the proxy.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app().oneshot(request).await.unwrap()
    }

    /// Number of requests the upstream received.
    pub async fn upstream_hits(&self) -> usize {
        self.upstream
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// `GET uri` with an empty body.
pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// `POST uri` with a JSON body.
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Reads a response body as JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
