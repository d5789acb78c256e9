//! Form model: the questions of one day (or one practice session) and the
//! answers given so far.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::types::{AnswerValue, FieldEdit, QuestionId, QuestionKind};

/// Which kind of form is being filled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormMode {
    /// The daily check-in.
    Daily,
    /// A deliberate-practice session on one category.
    Practice {
        /// Category being practised
        category: String,
    },
}

impl FormMode {
    /// Wire name of the mode (`daily` / `practice`).
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::Daily => "daily",
            FormMode::Practice { .. } => "practice",
        }
    }

    /// Category of a practice session.
    pub fn category(&self) -> Option<&str> {
        match self {
            FormMode::Daily => None,
            FormMode::Practice { category } => Some(category),
        }
    }
}

impl fmt::Display for FormMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormMode::Daily => write!(f, "daily"),
            FormMode::Practice { category } => write!(f, "practice:{category}"),
        }
    }
}

/// Identity of one form instance. Every save stream is scoped to a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormKey {
    /// Day the answers belong to
    pub date: NaiveDate,
    /// Daily or practice
    #[serde(flatten)]
    pub mode: FormMode,
}

impl FormKey {
    /// Key of the daily form for `date`.
    pub fn daily(date: NaiveDate) -> Self {
        Self {
            date,
            mode: FormMode::Daily,
        }
    }

    /// Key of a practice session on `category` held on `date`.
    pub fn practice(date: NaiveDate, category: impl Into<String>) -> Self {
        Self {
            date,
            mode: FormMode::Practice {
                category: category.into(),
            },
        }
    }
}

impl fmt::Display for FormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.mode, self.date.format("%Y-%m-%d"))
    }
}

/// A previous answer to the same question, shown as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Day of the answer
    pub date: NaiveDate,
    /// What was answered
    pub value: AnswerValue,
}

/// One question as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier (the consigne id)
    pub id: QuestionId,
    /// Text to display
    pub label: String,
    /// How to answer
    pub kind: QuestionKind,
    /// Category used for grouping
    #[serde(default)]
    pub category: String,
    /// Optional explanation
    #[serde(default)]
    pub help: Option<String>,
    /// Must be answered before submitting
    #[serde(default)]
    pub required: bool,
    /// Answer already stored for this form, if any
    #[serde(default)]
    pub value: Option<AnswerValue>,
    /// Most recent previous answers
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A form being filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Which form this is
    pub key: FormKey,
    /// Questions in display order
    pub questions: Vec<Question>,
    answers: BTreeMap<QuestionId, AnswerValue>,
}

impl Form {
    /// Builds a form, seeding answers from values the backend already holds.
    pub fn new(key: FormKey, questions: Vec<Question>) -> Self {
        let answers = questions
            .iter()
            .filter_map(|q| {
                q.value
                    .as_ref()
                    .filter(|v| !v.is_blank())
                    .map(|v| (q.id.clone(), v.clone()))
            })
            .collect();
        Self {
            key,
            questions,
            answers,
        }
    }

    /// Looks up a question by id.
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    /// Applies an edit to the form.
    ///
    /// Blank text is normalised to a clear. Returns the normalised edit, ready
    /// to be queued for saving.
    pub fn apply(&mut self, edit: FieldEdit) -> Result<FieldEdit> {
        if self.question(&edit.question).is_none() {
            return Err(Error::not_found("question", edit.question.as_str()));
        }

        let value = edit.value.filter(|v| !v.is_blank());
        match &value {
            Some(v) => {
                self.answers.insert(edit.question.clone(), v.clone());
            }
            None => {
                self.answers.remove(&edit.question);
            }
        }

        Ok(FieldEdit {
            question: edit.question,
            value,
        })
    }

    /// Current answer to a question.
    pub fn answer(&self, id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(id)
    }

    /// All current answers.
    pub fn answers(&self) -> &BTreeMap<QuestionId, AnswerValue> {
        &self.answers
    }

    /// Required questions without an answer.
    pub fn missing_required(&self) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.required && !self.answers.contains_key(&q.id))
            .collect()
    }

    /// Returns `true` when every required question is answered.
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Distinct categories, sorted. Feeds category pickers.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .questions
            .iter()
            .map(|q| q.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Questions grouped by category, groups in order of first appearance.
    pub fn by_category(&self) -> Vec<(&str, Vec<&Question>)> {
        let mut groups: Vec<(&str, Vec<&Question>)> = Vec::new();
        for question in &self.questions {
            match groups
                .iter_mut()
                .find(|(category, _)| *category == question.category)
            {
                Some((_, questions)) => questions.push(question),
                None => groups.push((question.category.as_str(), vec![question])),
            }
        }
        groups
    }
}
