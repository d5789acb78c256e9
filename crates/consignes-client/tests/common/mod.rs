//! Shared harness: a mock backend and a client pointed at it.

use chrono::NaiveDate;
use consignes_client::{ApiClient, BackendConfig, RetryPolicy};
use consignes_core::FormKey;
use serde_json::{Value, json};
use wiremock::MockServer;

/// Path the mock backend serves, shaped like a script deployment.
pub const EXEC_PATH: &str = "/macros/s/test/exec";

/// Token the harness client sends.
pub const TOKEN: &str = "secret-token";

/// Mock backend plus a client with fast retries.
pub struct TestHarness {
    /// The mock backend
    pub server: MockServer,
    /// Client pointed at `server`
    pub client: ApiClient,
}

impl TestHarness {
    /// Starts a server and a client allowing `retries` fast retries.
    pub async fn with_retries(retries: usize) -> Self {
        let server = MockServer::start().await;
        let config = BackendConfig {
            url: format!("{}{EXEC_PATH}", server.uri()),
            token: TOKEN.to_string(),
            timeout_secs: 5,
        };
        let client = ApiClient::new(&config)
            .unwrap()
            .with_retry(RetryPolicy::immediate(retries));
        Self { server, client }
    }

    /// Starts a server and a client allowing three retries.
    pub async fn new() -> Self {
        Self::with_retries(3).await
    }

    /// JSON bodies of every request the server received.
    pub async fn posted_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| !r.body.is_empty())
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

/// `{"ok": true, "data": data}`
pub fn ok(data: Value) -> Value {
    json!({ "ok": true, "data": data })
}

/// `{"ok": false, "error": message}`
pub fn failure(message: &str) -> Value {
    json!({ "ok": false, "error": message })
}

/// Daily form of Monday 2026-10-19.
pub fn monday() -> FormKey {
    FormKey::daily(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
}
