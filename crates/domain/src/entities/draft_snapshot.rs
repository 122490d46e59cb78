//! Point-in-time copies of a draft kept for recovery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::draft::Draft;
use crate::value_objects::{DraftId, SnapshotId};

/// An immutable, full copy of a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub id: SnapshotId,
    pub draft_id: DraftId,
    pub draft: Draft,
    pub timestamp: DateTime<Utc>,
}

impl DraftSnapshot {
    /// Copy a draft into a new snapshot taken now
    pub fn capture(draft: &Draft) -> Self {
        Self {
            id: SnapshotId::new(),
            draft_id: draft.id,
            draft: draft.clone(),
            timestamp: Utc::now(),
        }
    }
}
