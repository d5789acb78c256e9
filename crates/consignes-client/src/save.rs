//! Soft-save reconciliation.
//!
//! A [`SaveQueue`] sits between a form being edited and an unreliable,
//! rate-limited backend. It keeps two maps per form:
//!
//! - `pending`: edits not yet acknowledged, one entry per field, latest wins
//! - `acknowledged`: what the backend is known to hold
//!
//! A flush sends only the pending fields that differ from the acknowledged
//! snapshot, retries transient failures with backoff, and on final failure
//! puts the batch back without overwriting edits made in the meantime.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use consignes_core::api::{SaveReceipt, SaveRequest};
use consignes_core::{AnswerValue, Error, FieldEdit, FormKey, QuestionId, Result, SaveStatus};

use crate::retry::RetryPolicy;

/// Destination of answer saves. Implementations make a single attempt;
/// retrying is the queue's job.
#[async_trait]
pub trait AnswerSink: Send + Sync {
    /// Stores some answers without finalising the form.
    async fn save(&self, request: &SaveRequest) -> Result<SaveReceipt>;

    /// Stores the complete answer set and marks the form submitted.
    async fn submit(&self, request: &SaveRequest) -> Result<SaveReceipt>;
}

#[async_trait]
impl<S: AnswerSink + ?Sized> AnswerSink for Arc<S> {
    async fn save(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        (**self).save(request).await
    }

    async fn submit(&self, request: &SaveRequest) -> Result<SaveReceipt> {
        (**self).submit(request).await
    }
}

/// What a flush did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing needed saving.
    Clean,
    /// The backend acknowledged this many fields.
    Saved {
        /// Fields written
        fields: usize,
    },
}

type Answers = BTreeMap<QuestionId, Option<AnswerValue>>;

#[derive(Default)]
struct Ledger {
    pending: Answers,
    acknowledged: Answers,
    /// Batch currently being sent, empty between flushes.
    in_flight: Answers,
    ever_saved: bool,
    last_submit: Option<(blake3::Hash, SaveReceipt)>,
}

impl Ledger {
    fn acknowledged_value(&self, id: &QuestionId) -> Option<&AnswerValue> {
        self.acknowledged.get(id).and_then(Option::as_ref)
    }

    fn differs_from_acknowledged(&self, id: &QuestionId, value: &Option<AnswerValue>) -> bool {
        self.acknowledged_value(id) != value.as_ref()
    }

    /// Drops pending entries the backend already holds.
    fn prune_pending(&mut self) {
        let acknowledged = &self.acknowledged;
        self.pending.retain(|id, value| {
            acknowledged.get(id).and_then(Option::as_ref) != value.as_ref()
        });
    }

    fn resting_status(&self) -> SaveStatus {
        if !self.pending.is_empty() {
            SaveStatus::Dirty {
                pending: self.pending.len(),
            }
        } else if self.ever_saved {
            SaveStatus::Saved
        } else {
            SaveStatus::Idle
        }
    }
}

/// Save pipeline of one form.
pub struct SaveQueue<S> {
    key: FormKey,
    sink: S,
    retry: RetryPolicy,
    ledger: Mutex<Ledger>,
    flight: tokio::sync::Mutex<()>,
    status: watch::Sender<SaveStatus>,
}

impl<S: AnswerSink> SaveQueue<S> {
    /// Creates an empty queue for the form `key`.
    pub fn new(key: FormKey, sink: S, retry: RetryPolicy) -> Self {
        let (status, _rx) = watch::channel(SaveStatus::Idle);
        Self {
            key,
            sink,
            retry,
            ledger: Mutex::new(Ledger::default()),
            flight: tokio::sync::Mutex::new(()),
            status,
        }
    }

    /// Form this queue saves.
    pub fn key(&self) -> &FormKey {
        &self.key
    }

    /// Marks answers the backend served with the form as already saved.
    pub fn seed<I>(&self, answers: I)
    where
        I: IntoIterator<Item = (QuestionId, AnswerValue)>,
    {
        let mut ledger = self.ledger();
        ledger
            .acknowledged
            .extend(answers.into_iter().map(|(id, value)| (id, Some(value))));
        ledger.prune_pending();
    }

    /// Records an edit.
    ///
    /// Repeated edits of a field coalesce; an edit restoring the value the
    /// backend already holds cancels the pending save of that field. While
    /// the field is part of a batch in flight the edit is always kept, since
    /// the backend may end up holding the in-flight value instead.
    pub fn queue(&self, edit: FieldEdit) {
        let mut ledger = self.ledger();
        if ledger.in_flight.contains_key(&edit.question)
            || ledger.differs_from_acknowledged(&edit.question, &edit.value)
        {
            ledger.pending.insert(edit.question, edit.value);
        } else {
            ledger.pending.remove(&edit.question);
        }
        let status = ledger.resting_status();
        drop(ledger);

        if !matches!(
            *self.status.borrow(),
            SaveStatus::Saving | SaveStatus::Retrying { .. }
        ) {
            self.status.send_replace(status);
        }
    }

    /// Number of fields waiting to be saved.
    pub fn pending_len(&self) -> usize {
        self.ledger().pending.len()
    }

    /// Value of a field as last acknowledged by the backend.
    pub fn acknowledged(&self, id: &QuestionId) -> Option<AnswerValue> {
        self.ledger().acknowledged_value(id).cloned()
    }

    /// Current status.
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Sends pending edits to the backend.
    ///
    /// Flushes never overlap: a flush started while another is in flight
    /// waits for it, then sends whatever is still pending.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let _flight = self.flight.lock().await;

        let request = {
            let mut ledger = self.ledger();
            let batch: Answers = std::mem::take(&mut ledger.pending)
                .into_iter()
                .filter(|(id, value)| ledger.differs_from_acknowledged(id, value))
                .collect();
            if batch.is_empty() {
                let status = ledger.resting_status();
                drop(ledger);
                self.status.send_replace(status);
                return Ok(FlushOutcome::Clean);
            }
            ledger.in_flight = batch.clone();
            SaveRequest::new(&self.key).with_answers(batch)
        };

        let fields = request.answers.len();
        tracing::debug!(form = %self.key, fields, "Flushing answers");
        self.status.send_replace(SaveStatus::Saving);

        let result = self
            .retry
            .run_with(
                "save_answers",
                || self.sink.save(&request),
                Error::is_retryable,
                |attempt, delay| {
                    self.status
                        .send_replace(SaveStatus::Retrying { attempt, delay });
                },
            )
            .await;

        let mut ledger = self.ledger();
        ledger.in_flight.clear();
        match result {
            Ok(receipt) => {
                ledger.acknowledged.extend(request.answers);
                ledger.ever_saved = true;
                ledger.prune_pending();
                let status = ledger.resting_status();
                drop(ledger);
                self.status.send_replace(status);
                tracing::info!(form = %self.key, fields, saved = receipt.saved, "Answers saved");
                Ok(FlushOutcome::Saved { fields })
            }
            Err(err) => {
                for (id, value) in request.answers {
                    ledger.pending.entry(id).or_insert(value);
                }
                ledger.prune_pending();
                let pending = ledger.pending.len();
                drop(ledger);
                self.status.send_replace(SaveStatus::Failed(err.to_string()));
                tracing::warn!(form = %self.key, pending, error = %err, "Save failed, edits kept");
                Err(err)
            }
        }
    }

    /// Flushes, then submits the complete answer set.
    ///
    /// Submitting an answer set identical to the last successful submission
    /// returns the previous receipt without contacting the backend.
    pub async fn submit(&self) -> Result<SaveReceipt> {
        self.flush().await?;
        let _flight = self.flight.lock().await;

        let (request, fingerprint) = {
            let ledger = self.ledger();
            let mut answers = ledger.acknowledged.clone();
            answers.extend(ledger.pending.clone());
            let request = SaveRequest::new(&self.key).with_answers(answers);
            let fingerprint = blake3::hash(&request.canonical_bytes()?);

            if let Some((last, receipt)) = &ledger.last_submit
                && *last == fingerprint
            {
                tracing::debug!(form = %self.key, "Identical submission skipped");
                self.status.send_replace(SaveStatus::Submitted);
                return Ok(receipt.clone());
            }
            (request, fingerprint)
        };

        self.status.send_replace(SaveStatus::Saving);
        let result = self
            .retry
            .run_with(
                "submit_answers",
                || self.sink.submit(&request),
                Error::is_retryable,
                |attempt, delay| {
                    self.status
                        .send_replace(SaveStatus::Retrying { attempt, delay });
                },
            )
            .await;

        match result {
            Ok(receipt) => {
                let mut ledger = self.ledger();
                ledger.acknowledged.extend(request.answers);
                ledger.ever_saved = true;
                ledger.prune_pending();
                ledger.last_submit = Some((fingerprint, receipt.clone()));
                drop(ledger);
                self.status.send_replace(SaveStatus::Submitted);
                tracing::info!(form = %self.key, saved = receipt.saved, "Form submitted");
                Ok(receipt)
            }
            Err(err) => {
                self.status.send_replace(SaveStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flushes a [`SaveQueue`] in the background once edits stop arriving for
/// the debounce window.
pub struct Autosaver<S> {
    queue: Arc<SaveQueue<S>>,
    touch: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl<S: AnswerSink + 'static> Autosaver<S> {
    /// Starts the background task.
    pub fn spawn(queue: Arc<SaveQueue<S>>, debounce: Duration) -> Self {
        let (touch, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce_loop(queue.clone(), rx, debounce));
        Self { queue, touch, task }
    }

    /// Queues an edit and restarts the debounce window.
    pub fn edit(&self, edit: FieldEdit) {
        self.queue.queue(edit);
        if self.touch.send(()).is_err() {
            tracing::warn!(form = %self.queue.key(), "Autosave task is gone");
        }
    }

    /// Queue being flushed.
    pub fn queue(&self) -> &Arc<SaveQueue<S>> {
        &self.queue
    }

    /// Stops the task and flushes whatever is still pending.
    pub async fn close(self) -> Result<FlushOutcome> {
        let Self { queue, touch, task } = self;
        drop(touch);
        task.await
            .map_err(|e| Error::Io(std::io::Error::other(format!("autosave task failed: {e}"))))?;
        queue.flush().await
    }
}

async fn debounce_loop<S: AnswerSink>(
    queue: Arc<SaveQueue<S>>,
    mut touches: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            touch = touches.recv() => match touch {
                Some(()) => deadline = Some(Instant::now() + debounce),
                None => break,
            },
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Err(err) = queue.flush().await {
                    tracing::warn!(form = %queue.key(), error = %err, "Autosave failed");
                }
            }
        }
    }
    tracing::debug!(form = %queue.key(), "Autosave stopped");
}
