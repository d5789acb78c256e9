//! Save status reported to whoever renders the form.

use std::fmt;
use std::time::Duration;

/// Where the soft-save pipeline of a form currently stands.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SaveStatus {
    /// Nothing edited since the form was loaded.
    Idle,
    /// Edits are waiting to be saved.
    Dirty {
        /// Number of fields waiting
        pending: usize,
    },
    /// A save request is in flight.
    Saving,
    /// The last attempt failed with a transient error; another is scheduled.
    Retrying {
        /// Retry number (1-indexed)
        attempt: usize,
        /// Wait before the next attempt
        delay: Duration,
    },
    /// Everything edited so far is acknowledged by the backend.
    Saved,
    /// The form was submitted.
    Submitted,
    /// Saving gave up; edits are kept pending.
    Failed(String),
}

impl SaveStatus {
    /// Returns `true` if there is work not yet acknowledged by the backend.
    pub fn has_unsaved(&self) -> bool {
        matches!(
            self,
            Self::Dirty { .. } | Self::Saving | Self::Retrying { .. } | Self::Failed(_)
        )
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dirty { pending } => write!(f, "{pending} unsaved"),
            Self::Saving => write!(f, "saving"),
            Self::Retrying { attempt, delay } => {
                write!(f, "retry #{attempt} in {}ms", delay.as_millis())
            }
            Self::Saved => write!(f, "saved"),
            Self::Submitted => write!(f, "submitted"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
