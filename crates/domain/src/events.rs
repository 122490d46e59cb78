//! Cross-tab change events
//!
//! A [`StorageChangeEvent`] is the typed form of one substrate write made by
//! another tab, scoped to a single draft. Events are transient and never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::{
    entities::{Draft, DraftLock},
    value_objects::DraftId,
};

/// A substrate mutation relevant to one draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageChangeEvent {
    /// Another tab saved the draft
    DraftUpdated { draft: Box<Draft> },
    /// The draft record was removed
    DraftRemoved { draft_id: DraftId },
    /// Another tab wrote (acquired or refreshed) the lock
    LockAcquired { lock: DraftLock },
    /// The lock entry was removed
    LockReleased { draft_id: DraftId },
    /// The snapshot history changed length
    SnapshotsChanged { draft_id: DraftId, count: usize },
}

impl StorageChangeEvent {
    /// The draft this event concerns
    pub fn draft_id(&self) -> DraftId {
        match self {
            Self::DraftUpdated { draft } => draft.id,
            Self::LockAcquired { lock } => lock.draft_id,
            Self::DraftRemoved { draft_id }
            | Self::LockReleased { draft_id }
            | Self::SnapshotsChanged { draft_id, .. } => *draft_id,
        }
    }

    /// Short name for logging
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DraftUpdated { .. } => "draft_updated",
            Self::DraftRemoved { .. } => "draft_removed",
            Self::LockAcquired { .. } => "lock_acquired",
            Self::LockReleased { .. } => "lock_released",
            Self::SnapshotsChanged { .. } => "snapshots_changed",
        }
    }
}
