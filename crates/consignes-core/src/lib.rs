#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Consignes Core Library
//!
//! Domain types, wire format and form model shared by the Consignes client,
//! proxy and command-line tool.

pub mod api;
pub mod dates;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use types::{
    AnswerValue, Consigne, ConsigneDraft, ConsigneId, FieldEdit, Form, FormKey, FormMode,
    Frequency, HistoryEntry, Question, QuestionId, QuestionKind, SaveStatus,
};
