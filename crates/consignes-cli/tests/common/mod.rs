//! Shared harness: a mock backend and a config file pointing at it.

use std::path::PathBuf;

use clap::Parser;
use consignes_cli::{Cli, ConsignesConfig};
use consignes_client::RetryPolicy;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::MockServer;

/// Path the mock backend serves.
pub const EXEC_PATH: &str = "/macros/s/test/exec";

/// Mock backend, plus a config file written to a temporary directory.
pub struct TestHarness {
    /// The mock backend
    pub server: MockServer,
    /// Effective configuration
    pub config: ConsignesConfig,
    /// Where `config` was written
    pub config_path: PathBuf,
    _dir: TempDir,
}

impl TestHarness {
    /// Starts a server and writes a config with fast retries.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let mut config = ConsignesConfig::default();
        config.backend.url = format!("{}{EXEC_PATH}", server.uri());
        config.backend.token = "cli-token".to_string();
        config.backend.timeout_secs = 5;
        config.retry = RetryPolicy::immediate(2);
        config.autosave.debounce_ms = 10;

        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, config.to_toml_string().unwrap()).unwrap();

        Self {
            server,
            config,
            config_path,
            _dir: dir,
        }
    }

    /// Runs `consignes <args> --config <harness config>`.
    pub async fn run(&self, args: &[&str]) -> consignes_cli::Result<()> {
        let mut argv = vec!["consignes"];
        argv.extend_from_slice(args);
        argv.push("--config");
        argv.push(self.config_path.to_str().unwrap());
        consignes_cli::run(Cli::try_parse_from(argv).unwrap()).await
    }

    /// JSON bodies of every POST the server received.
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

/// Daily form with a required scale question and an optional yes/no.
pub fn daily_form(mood: Option<&str>) -> Value {
    ok(json!({
        "questions": [
            {
                "id": "q-mood",
                "label": "Humeur",
                "kind": { "type": "likert" },
                "category": "Esprit",
                "required": true,
                "value": mood
            },
            {
                "id": "q-sleep",
                "label": "Dormi 8h ?",
                "kind": { "type": "yes_no" },
                "category": "Santé",
                "value": true
            }
        ]
    }))
}

/// A consigne record as the backend returns it.
pub fn consigne_json(id: &str, label: &str, category: &str) -> Value {
    json!({
        "id": id,
        "label": label,
        "category": category,
        "kind": { "type": "yes_no" },
        "frequency": { "type": "daily" },
        "active": true,
        "priority": 2
    })
}
