//! Wire format of the spreadsheet-backed backend.
//!
//! The backend is a single URL. Reads are GET requests selected by an
//! `action` query parameter; writes are POSTed JSON [`Command`]s tagged by
//! `action`. Every response is wrapped in an [`ApiResponse`] envelope.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::{
    AnswerValue, ConsigneDraft, ConsigneId, Form, FormKey, FormMode, Question, QuestionId,
};

/// Query parameter carrying the user's token.
pub const TOKEN_PARAM: &str = "token";

/// Backend messages that mean "quota exhausted, come back later".
const RATE_LIMIT_MARKERS: [&str; 3] = ["too many times", "rate limit", "quota"];

/// Response envelope: `{"ok": true, "data": ...}` or `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the backend handled the request
    pub ok: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Message on failure
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Wraps a successful payload.
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Builds a failure envelope.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unwraps the envelope into a `Result`.
    ///
    /// A failure whose message mentions quota exhaustion becomes
    /// [`Error::RateLimited`] so it is retried; any other failure is a
    /// permanent [`Error::Backend`].
    pub fn into_result(self) -> Result<T> {
        if self.ok {
            return self
                .data
                .ok_or_else(|| Error::backend("response is missing its data field"));
        }

        let message = self
            .error
            .unwrap_or_else(|| "backend reported a failure without a message".to_string());
        let lowered = message.to_lowercase();
        if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
            return Err(Error::RateLimited {
                retry_after_secs: None,
            });
        }
        Err(Error::Backend { message })
    }
}

/// GET query parameters, serialised with `reqwest`'s `.query()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Query {
    /// Questions of a form, with stored answers
    Form {
        /// Day, `YYYY-MM-DD`
        date: String,
        /// `daily` or `practice`
        mode: &'static str,
        /// Practice category
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    /// Every consigne
    Consignes,
}

impl Query {
    /// Query for the form identified by `key`.
    pub fn form(key: &FormKey) -> Self {
        Query::Form {
            date: crate::dates::format_date(key.date),
            mode: key.mode.as_str(),
            category: key.mode.category().map(str::to_string),
        }
    }
}

/// Data returned by the `form` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPayload {
    /// Questions in display order
    pub questions: Vec<Question>,
}

impl FormPayload {
    /// Turns the payload into a [`Form`] for `key`.
    pub fn into_form(self, key: FormKey) -> Form {
        Form::new(key, self.questions)
    }
}

/// Body of `save_answers` and `submit_answers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Day the answers belong to
    pub date: NaiveDate,
    /// Daily or practice (flattened as `mode` + `category`)
    #[serde(flatten)]
    pub mode: FormMode,
    /// Answers keyed by question; `null` clears a stored answer
    pub answers: BTreeMap<QuestionId, Option<AnswerValue>>,
}

impl SaveRequest {
    /// Creates an empty request for the form `key`.
    pub fn new(key: &FormKey) -> Self {
        Self {
            date: key.date,
            mode: key.mode.clone(),
            answers: BTreeMap::new(),
        }
    }

    /// Adds answers to the request.
    pub fn with_answers<I>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = (QuestionId, Option<AnswerValue>)>,
    {
        self.answers.extend(answers);
        self
    }

    /// Canonical JSON bytes, used to fingerprint requests.
    ///
    /// Field order is fixed by the struct and answers are a `BTreeMap`, so two
    /// equal requests always produce the same bytes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A write sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Command {
    /// Soft-save of some answers
    SaveAnswers(SaveRequest),
    /// Final submission of the whole form
    SubmitAnswers(SaveRequest),
    /// New consigne
    CreateConsigne {
        /// Fields of the consigne
        consigne: ConsigneDraft,
    },
    /// Replace a consigne
    UpdateConsigne {
        /// Consigne to update
        id: ConsigneId,
        /// New fields
        consigne: ConsigneDraft,
    },
    /// Remove a consigne
    DeleteConsigne {
        /// Consigne to delete
        id: ConsigneId,
    },
}

impl Command {
    /// Wire name of the command, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Command::SaveAnswers(_) => "save_answers",
            Command::SubmitAnswers(_) => "submit_answers",
            Command::CreateConsigne { .. } => "create_consigne",
            Command::UpdateConsigne { .. } => "update_consigne",
            Command::DeleteConsigne { .. } => "delete_consigne",
        }
    }
}

/// Acknowledgement of a save or submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReceipt {
    /// Number of answers written
    pub saved: usize,
    /// Server time of the write
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Acknowledgement of a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deleted {
    /// Consigne that was removed
    pub id: ConsigneId,
}
