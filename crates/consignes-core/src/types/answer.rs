//! Question kinds, answer values and field edits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::QuestionId;

/// Options of the five-point scale used by `Likert` questions, plus "n/a".
///
/// Pairs of (wire key, display label).
pub static LIKERT_OPTIONS: [(&str, &str); 6] = [
    ("oui", "Oui"),
    ("plutot_oui", "Plutôt oui"),
    ("moyen", "Moyen"),
    ("plutot_non", "Plutôt non"),
    ("non", "Non"),
    ("na", "Sans objet"),
];

/// How a question is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum QuestionKind {
    /// Five-point agreement scale (see [`LIKERT_OPTIONS`]).
    Likert,
    /// Plain yes/no checkbox.
    YesNo,
    /// Free numeric value (hours slept, glasses of water, ...).
    Number,
    /// Single line of text.
    ShortText,
    /// Multi-line free text.
    LongText,
    /// One value among a fixed list.
    Choice {
        /// Allowed values, in display order
        options: Vec<String>,
    },
}

impl QuestionKind {
    /// Short hint shown next to a prompt in the terminal.
    pub fn hint(&self) -> String {
        match self {
            QuestionKind::Likert => LIKERT_OPTIONS
                .iter()
                .enumerate()
                .map(|(i, (_, label))| format!("{}={label}", i + 1))
                .collect::<Vec<_>>()
                .join(" "),
            QuestionKind::YesNo => "o/n".to_string(),
            QuestionKind::Number => "nombre".to_string(),
            QuestionKind::ShortText | QuestionKind::LongText => "texte".to_string(),
            QuestionKind::Choice { options } => options
                .iter()
                .enumerate()
                .map(|(i, option)| format!("{}={option}", i + 1))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Likert => write!(f, "likert"),
            QuestionKind::YesNo => write!(f, "yes_no"),
            QuestionKind::Number => write!(f, "number"),
            QuestionKind::ShortText => write!(f, "short_text"),
            QuestionKind::LongText => write!(f, "long_text"),
            QuestionKind::Choice { .. } => write!(f, "choice"),
        }
    }
}

/// A single answer as stored in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Checkbox value
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Text, Likert key or choice option
    Text(String),
}

impl AnswerValue {
    /// Interprets raw terminal input for a question of the given kind.
    ///
    /// Blank input means "clear the answer" and yields `None`.
    pub fn parse_for(kind: &QuestionKind, raw: &str) -> Result<Option<AnswerValue>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let value = match kind {
            QuestionKind::YesNo => match raw.to_lowercase().as_str() {
                "o" | "oui" | "y" | "yes" | "true" | "1" => AnswerValue::Bool(true),
                "n" | "non" | "no" | "false" | "0" => AnswerValue::Bool(false),
                other => {
                    return Err(Error::validation(format!(
                        "'{other}' is not a yes/no answer"
                    )));
                }
            },
            QuestionKind::Number => {
                let number = raw
                    .replace(',', ".")
                    .parse::<f64>()
                    .map_err(|_| Error::validation(format!("'{raw}' is not a number")))?;
                AnswerValue::Number(number)
            }
            QuestionKind::Likert => {
                let lowered = raw.to_lowercase();
                let key = raw
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| LIKERT_OPTIONS.get(i))
                    .or_else(|| {
                        LIKERT_OPTIONS.iter().find(|(key, label)| {
                            *key == lowered || label.to_lowercase() == lowered
                        })
                    })
                    .map(|(key, _)| *key)
                    .ok_or_else(|| {
                        Error::validation(format!("'{raw}' is not a scale answer"))
                    })?;
                AnswerValue::Text(key.to_string())
            }
            QuestionKind::Choice { options } => {
                let picked = raw
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i))
                    .cloned()
                    .unwrap_or_else(|| raw.to_string());
                AnswerValue::Text(picked)
            }
            QuestionKind::ShortText | QuestionKind::LongText => AnswerValue::Text(raw.to_string()),
        };

        Ok(Some(value))
    }

    /// Returns `true` for values that carry no information (empty text).
    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Bool(true) => write!(f, "oui"),
            AnswerValue::Bool(false) => write!(f, "non"),
            AnswerValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AnswerValue::Number(n) => write!(f, "{n}"),
            AnswerValue::Text(s) => {
                let label = LIKERT_OPTIONS
                    .iter()
                    .find(|(key, _)| *key == s.as_str())
                    .map(|(_, label)| *label)
                    .unwrap_or(s.as_str());
                write!(f, "{label}")
            }
        }
    }
}

/// One incremental change to a form field.
///
/// `value: None` clears the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEdit {
    /// Question being answered
    pub question: QuestionId,
    /// New value, or `None` to clear
    pub value: Option<AnswerValue>,
}

impl FieldEdit {
    /// Creates an edit setting a value.
    pub fn set(question: impl Into<QuestionId>, value: AnswerValue) -> Self {
        Self {
            question: question.into(),
            value: Some(value),
        }
    }

    /// Creates an edit clearing a value.
    pub fn clear(question: impl Into<QuestionId>) -> Self {
        Self {
            question: question.into(),
            value: None,
        }
    }
}
