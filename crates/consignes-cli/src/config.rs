//! The `consignes` configuration file.
//!
//! Resolved from `--config`, then `CONSIGNES_CONFIG`, then
//! `<config dir>/consignes/config.toml`. `CONSIGNES_BACKEND_URL` and
//! `CONSIGNES_TOKEN` override the file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use consignes_client::{AutosaveConfig, BackendConfig, RetryPolicy};
use consignes_proxy::ProxyConfig;

use crate::error::{Error, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CONSIGNES_CONFIG";
/// Environment variable overriding `backend.url`.
pub const BACKEND_URL_ENV: &str = "CONSIGNES_BACKEND_URL";
/// Environment variable overriding `backend.token`.
pub const TOKEN_ENV: &str = "CONSIGNES_TOKEN";

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsignesConfig {
    /// `[backend]`
    pub backend: BackendConfig,
    /// `[retry]`
    pub retry: RetryPolicy,
    /// `[autosave]`
    pub autosave: AutosaveConfig,
    /// `[proxy]`
    pub proxy: ProxyConfig,
}

impl ConsignesConfig {
    /// `<config dir>/consignes/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("consignes").join("config.toml"))
    }

    /// Path the configuration is read from.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            _ => Self::default_config_path(),
        }
    }

    /// Loads the configuration and applies environment overrides.
    ///
    /// A missing default file yields the defaults; a missing file that was
    /// asked for explicitly is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit) {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::from_toml_str(&content)
                    .map_err(|e| Error::config(format!("{}: {e}", path.display())))?
            }
            Some(path) if explicit.is_some() => {
                return Err(Error::config(format!(
                    "Config file does not exist at {}",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Serialises to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Applies `CONSIGNES_BACKEND_URL` and `CONSIGNES_TOKEN` as returned by
    /// `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.url = url;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.token = token;
        }
    }

    /// Proxy settings, with the upstream defaulting to the backend URL.
    pub fn proxy_config(&self, bind: Option<&str>) -> ProxyConfig {
        let mut proxy = self.proxy.clone();
        if proxy.upstream.trim().is_empty() {
            proxy.upstream = self.backend.url.clone();
        }
        if let Some(bind) = bind {
            proxy.bind = bind.to_string();
        }
        proxy
    }
}
