//! Conflict detection results

use serde::{Deserialize, Serialize};

use super::{draft::Draft, draft_lock::DraftLock};

/// Outcome of checking a draft's lock against the local tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConflictCheck {
    /// True iff a live lock held by another tab exists
    pub has_conflict: bool,
    /// The stored lock, whoever holds it
    pub lock: Option<DraftLock>,
}

impl ConflictCheck {
    /// No lock stored
    pub const fn clear() -> Self {
        Self {
            has_conflict: false,
            lock: None,
        }
    }

    /// The stored lock, present only when it conflicts
    pub fn conflicting_lock(&self) -> Option<&DraftLock> {
        self.lock.as_ref().filter(|_| self.has_conflict)
    }
}

/// Conflict state captured by a session for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftConflict {
    pub has_conflict: bool,
    /// The foreign lock that caused the conflict
    pub lock: Option<DraftLock>,
    /// The draft as last persisted by the other tab
    pub remote_draft: Option<Draft>,
}

impl DraftConflict {
    pub fn new(lock: Option<DraftLock>, remote_draft: Option<Draft>) -> Self {
        Self {
            has_conflict: true,
            lock,
            remote_draft,
        }
    }
}
