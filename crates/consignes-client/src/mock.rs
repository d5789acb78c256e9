//! In-memory [`AnswerSink`] with scripted outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use consignes_core::api::{SaveReceipt, SaveRequest};
use consignes_core::{Error, Result};

use crate::save::AnswerSink;

/// Outcome of one call to a [`MockSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// The call succeeds
    Ok,
    /// The call fails with a retryable 503
    Transient,
    /// The call fails with a permanent backend error
    Permanent,
}

/// Sink that replays a script, then succeeds.
#[derive(Debug, Default)]
pub struct MockSink {
    script: Mutex<VecDeque<Scripted>>,
    hold: Mutex<Option<Duration>>,
    saves: Mutex<Vec<SaveRequest>>,
    submits: Mutex<Vec<SaveRequest>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSink {
    /// A sink where every call succeeds.
    pub fn always_ok() -> Self {
        Self::default()
    }

    /// A sink that plays `script` in order, one entry per call.
    pub fn scripted(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Delays the next call by `delay`.
    pub fn hold_next(&self, delay: Duration) {
        *lock(&self.hold) = Some(delay);
    }

    /// Calls made so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Successful saves, in order.
    pub fn saves(&self) -> Vec<SaveRequest> {
        lock(&self.saves).clone()
    }

    /// Successful submissions, in order.
    pub fn submits(&self) -> Vec<SaveRequest> {
        lock(&self.submits).clone()
    }

    async fn call(&self, request: &SaveRequest, log: &Mutex<Vec<SaveRequest>>) -> Result<SaveReceipt> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let hold = lock(&self.hold).take();
        if let Some(delay) = hold {
            tokio::time::sleep(delay).await;
        }
        let outcome = lock(&self.script).pop_front().unwrap_or(Scripted::Ok);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Scripted::Ok => {
                lock(log).push(request.clone());
                Ok(SaveReceipt {
                    saved: request.answers.len(),
                    updated_at: None,
                })
            }
            Scripted::Transient => Err(Error::http_status(503, "service unavailable")),
            Scripted::Permanent => Err(Error::backend("sheet is protected")),
        }
    }
}

#[async_trait]
impl AnswerSink for MockSink {
    async fn save(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        self.call(request, &self.saves).await
    }

    async fn submit(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        self.call(request, &self.submits).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
