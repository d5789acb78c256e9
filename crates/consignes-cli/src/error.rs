//! Error types for consignes-cli

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for consignes-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in consignes-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from the core library or the backend client
    #[error(transparent)]
    Core(#[from] consignes_core::Error),

    /// Error from the proxy
    #[error(transparent)]
    Proxy(#[from] consignes_proxy::ProxyError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// File I/O error
    #[error("I/O error at {}: {source}", path.display())]
    File {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Terminal I/O error
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    /// Submission refused because required questions are unanswered
    #[error("{} required question(s) unanswered: {}", labels.len(), labels.join(", "))]
    Incomplete {
        /// Labels of the unanswered questions
        labels: Vec<String>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn io_with_path(source: std::io::Error, path: &Path) -> Self {
        Self::File {
            path: path.to_path_buf(),
            source,
        }
    }
}
