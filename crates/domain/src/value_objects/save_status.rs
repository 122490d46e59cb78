//! Save status value object
//!
//! The status an editing session exposes to its UI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Autosave status of an editing session
///
/// `Idle -> Saving -> Saved -> Idle` is the normal cycle. `Conflict` can be
/// entered from any state and is left only by an explicit dismissal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// A save has been scheduled or is being written
    Saving,
    /// The last save completed; shown briefly before reverting to idle
    Saved,
    /// Another tab holds a live lock on the draft
    Conflict,
}

impl SaveStatus {
    /// Whether saving is currently suppressed
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Lowercase label used in logs and terminal output
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(SaveStatus::default(), SaveStatus::Idle);
    }

    #[test]
    fn only_conflict_is_conflict() {
        assert!(SaveStatus::Conflict.is_conflict());
        assert!(!SaveStatus::Saving.is_conflict());
        assert!(!SaveStatus::Saved.is_conflict());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(SaveStatus::Saving.to_string(), "saving");
        assert_eq!(SaveStatus::Conflict.to_string(), "conflict");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SaveStatus::Saved).unwrap();
        assert_eq!(json, "\"saved\"");
    }
}
