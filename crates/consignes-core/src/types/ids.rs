//! Identifier types for questions and consignes.
//!
//! Both are opaque strings assigned by the backend (spreadsheet row keys),
//! so they are kept as strings rather than parsed.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string.
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a question inside a form.
    ///
    /// # Examples
    ///
    /// ```
    /// use consignes_core::QuestionId;
    ///
    /// let id = QuestionId::new("sleep-before-23h");
    /// assert_eq!(id.as_str(), "sleep-before-23h");
    /// ```
    QuestionId
);

string_id!(
    /// Identifier of a consigne (habit definition) record.
    ConsigneId
);

impl From<ConsigneId> for QuestionId {
    fn from(id: ConsigneId) -> Self {
        Self(id.0)
    }
}
