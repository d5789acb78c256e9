//! Exponential backoff for calls to the backend.
//!
//! The backend is a spreadsheet script with a per-day quota and frequent
//! transient failures, so every call goes through a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};

use consignes_core::{Error, Result};

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub min_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Growth factor between delays
    pub factor: f32,
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: usize,
    /// Randomise delays to avoid synchronized retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 8_000,
            factor: 2.0,
            max_retries: 5,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// A fast policy for tests: millisecond delays, no jitter.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            min_delay_ms: 1,
            max_delay_ms: 5,
            factor: 2.0,
            max_retries,
            jitter: false,
        }
    }

    /// Builds the `backon` backoff matching this policy.
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms)))
            .with_factor(self.factor.max(1.0))
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Runs `f`, retrying every error that [`Error::is_retryable`].
    pub async fn run<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_with(operation, f, Error::is_retryable, |_, _| {})
            .await
    }

    /// Runs `f`, retrying errors accepted by `when` and calling `on_retry`
    /// with the retry number and delay before each new attempt.
    pub async fn run_with<T, F, Fut, W, N>(
        &self,
        operation: &str,
        f: F,
        when: W,
        mut on_retry: N,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        W: FnMut(&Error) -> bool,
        N: FnMut(usize, Duration),
    {
        let mut attempt = 0usize;
        let result = f
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(when)
            .notify(|err: &Error, delay: Duration| {
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Backend call failed, retrying"
                );
                on_retry(attempt, delay);
            })
            .await;

        if let Err(err) = &result {
            tracing::error!(operation, retries = attempt, error = %err, "Backend call failed");
        }
        result
    }
}

/// Errors after which replaying a non-idempotent write cannot duplicate it:
/// the backend refused the request before doing any work.
pub fn is_refused_before_processing(err: &Error) -> bool {
    match err {
        Error::RateLimited { .. } => true,
        Error::Http {
            status: Some(code), ..
        } => *code == 429 || *code == 503,
        _ => false,
    }
}
