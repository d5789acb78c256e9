//! Client-side configuration sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the backend lives and how to authenticate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend URL (the spreadsheet script's deployment, or the proxy's `/api`)
    pub url: String,
    /// Token sent as the `token` query parameter
    pub token: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: 20,
        }
    }
}

impl BackendConfig {
    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Autosave behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is sent
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 1_500 }
    }
}

impl AutosaveConfig {
    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
