//! Proxy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[proxy]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address to listen on
    pub bind: String,
    /// Backend URL requests are forwarded to
    pub upstream: String,
    /// How long a cached GET stays fresh
    pub cache_ttl_secs: u64,
    /// Most responses kept in memory
    pub cache_capacity: usize,
    /// Timeout of upstream requests
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            upstream: String::new(),
            cache_ttl_secs: 60,
            cache_capacity: 256,
            timeout_secs: 30,
        }
    }
}

impl ProxyConfig {
    /// Cache freshness window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Upstream request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
