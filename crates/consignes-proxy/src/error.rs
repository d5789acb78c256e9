//! Error types for the proxy.

use axum::http::{Method, StatusCode, header::ALLOW};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur while proxying.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProxyError {
    /// The upstream could not be reached or its body could not be read
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// `/api` only forwards GET and POST
    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Binding or serving failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Config { .. } | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Proxy request failed");
        }
        // Same envelope as the backend so clients parse one error shape.
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        match self {
            Self::MethodNotAllowed(_) => (status, [(ALLOW, "GET, POST")], body).into_response(),
            _ => (status, body).into_response(),
        }
    }
}
