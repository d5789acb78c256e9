//! Error types for the Consignes core library.

/// Errors that can occur while talking to the backend or editing forms.
///
/// `is_retryable` separates transient failures from permanent ones.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport or HTTP-level failure (connection reset, 5xx, ...)
    #[error("HTTP error: {message}")]
    Http {
        /// What failed
        message: String,
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Underlying transport error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend refused the request because its quota is exhausted
    #[error("Rate limited by backend")]
    RateLimited {
        /// Seconds the backend asked us to wait, if it said so
        retry_after_secs: Option<u64>,
    },

    /// The backend answered but reported a logical failure (`ok: false`)
    #[error("Backend error: {message}")]
    Backend {
        /// Message reported by the backend
        message: String,
    },

    /// Presence check failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// A record the caller referenced does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record ("question", "consigne", ...)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// I/O error (terminal, config file, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unserialisable JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// The offending setting
        message: String,
    },

    /// Request timed out
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// Request timeout that elapsed
        seconds: u64,
    },
}

/// Convenience `Result` type alias for Consignes operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is worth retrying.
    ///
    /// Transport failures, throttling, timeouts and server-side (5xx, 408,
    /// 429) statuses are retryable. Everything the backend answered
    /// deliberately is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http { status, .. } => match status {
                None => true,
                Some(code) => *code == 408 || *code == 429 || (500..600).contains(code),
            },
            Error::RateLimited { .. } => true,
            Error::Timeout { .. } => true,
            Error::Io(_) => true,
            Error::Backend { .. } => false,
            Error::Validation { .. } => false,
            Error::NotFound { .. } => false,
            Error::Serialization(_) => false,
            Error::Config { .. } => false,
        }
    }

    /// Creates a new HTTP error without a status (transport failure).
    pub fn http<S: Into<String>>(message: S) -> Self {
        Error::Http {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a new HTTP error for a non-success response status.
    pub fn http_status<S: Into<String>>(status: u16, message: S) -> Self {
        Error::Http {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Creates a new HTTP error with a message and source error.
    pub fn http_with_source<S, E>(message: S, status: Option<u16>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Http {
            message: message.into(),
            status,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new not-found error.
    pub fn not_found<S: Into<String>>(kind: &'static str, id: S) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}
