//! Core types for Consignes forms and records.

mod answer;
mod consigne;
mod form;
mod ids;
mod proptests;
mod status;

pub use answer::{AnswerValue, FieldEdit, LIKERT_OPTIONS, QuestionKind};
pub use consigne::{Consigne, ConsigneDraft, Frequency, categories};
pub use form::{Form, FormKey, FormMode, HistoryEntry, Question};
pub use ids::{ConsigneId, QuestionId};
pub use status::SaveStatus;
