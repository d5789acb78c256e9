//! Consigne (habit definition) records.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ConsigneId, QuestionKind};

/// When a consigne shows up in a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Frequency {
    /// Every day.
    #[default]
    Daily,
    /// Only on the listed days of the week.
    Weekdays {
        /// Days on which the consigne is asked
        days: Vec<Weekday>,
    },
    /// Never in the daily form, only in deliberate-practice sessions.
    Practice,
}

impl Frequency {
    /// Returns `true` if a consigne with this frequency belongs in the daily
    /// form for `date`.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        match self {
            Frequency::Daily => true,
            Frequency::Weekdays { days } => days.contains(&date.weekday()),
            Frequency::Practice => false,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekdays { days } => {
                let days: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                write!(f, "weekdays({})", days.join(","))
            }
            Frequency::Practice => write!(f, "practice"),
        }
    }
}

fn default_active() -> bool {
    true
}

fn default_priority() -> u8 {
    2
}

/// A habit definition as stored in the backend's consignes sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consigne {
    /// Backend-assigned identifier
    pub id: ConsigneId,
    /// Question text shown in forms
    pub label: String,
    /// Grouping category
    pub category: String,
    /// How the consigne is answered
    pub kind: QuestionKind,
    /// When it is asked
    #[serde(default)]
    pub frequency: Frequency,
    /// Optional explanation shown under the question
    #[serde(default)]
    pub help: Option<String>,
    /// Inactive consignes are kept for history but never asked
    #[serde(default = "default_active")]
    pub active: bool,
    /// 1 (high) to 3 (low)
    #[serde(default = "default_priority")]
    pub priority: u8,
}

/// Payload for creating or updating a consigne.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsigneDraft {
    /// Question text shown in forms
    pub label: String,
    /// Grouping category
    pub category: String,
    /// How the consigne is answered
    pub kind: QuestionKind,
    /// When it is asked
    pub frequency: Frequency,
    /// Optional explanation
    pub help: Option<String>,
    /// Whether the consigne is asked at all
    pub active: bool,
    /// 1 (high) to 3 (low)
    pub priority: u8,
}

impl ConsigneDraft {
    /// Creates a daily, active, normal-priority draft.
    pub fn new(
        label: impl Into<String>,
        category: impl Into<String>,
        kind: QuestionKind,
    ) -> Self {
        Self {
            label: label.into(),
            category: category.into(),
            kind,
            frequency: Frequency::Daily,
            help: None,
            active: true,
            priority: default_priority(),
        }
    }

    /// Sets the frequency.
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Presence checks before sending the draft to the backend.
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::validation_field("label", "must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(Error::validation_field("category", "must not be empty"));
        }
        if let QuestionKind::Choice { options } = &self.kind
            && options.iter().all(|o| o.trim().is_empty())
        {
            return Err(Error::validation_field(
                "options",
                "a choice question needs at least one option",
            ));
        }
        if let Frequency::Weekdays { days } = &self.frequency
            && days.is_empty()
        {
            return Err(Error::validation_field(
                "frequency",
                "at least one weekday is required",
            ));
        }
        Ok(())
    }
}

impl From<&Consigne> for ConsigneDraft {
    fn from(consigne: &Consigne) -> Self {
        Self {
            label: consigne.label.clone(),
            category: consigne.category.clone(),
            kind: consigne.kind.clone(),
            frequency: consigne.frequency.clone(),
            help: consigne.help.clone(),
            active: consigne.active,
            priority: consigne.priority,
        }
    }
}

/// Distinct categories of a set of consignes, sorted.
pub fn categories<'a, I>(consignes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Consigne>,
{
    let mut categories: Vec<String> = consignes
        .into_iter()
        .map(|c| c.category.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}
