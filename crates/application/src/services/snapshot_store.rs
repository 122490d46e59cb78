//! Snapshot Store - bounded version history per draft
//!
//! Snapshots for a draft are kept as one JSON array, oldest first. Appending
//! past the retention bound drops entries from the front.

use std::sync::Arc;

use domain::{Draft, DraftId, DraftSnapshot, SnapshotId, StorageKey};
use tracing::{debug, instrument, warn};

use crate::{error::ApplicationError, ports::KeyValueStorePort};

/// Appends and reads draft snapshots
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStorePort>,
    max_snapshots: usize,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("max_snapshots", &self.max_snapshots)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Create a store retaining at most `max_snapshots` per draft
    pub fn new(store: Arc<dyn KeyValueStorePort>, max_snapshots: usize) -> Self {
        Self {
            store,
            max_snapshots: max_snapshots.max(1),
        }
    }

    pub const fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    /// Append a copy of `draft` to its history, evicting the oldest entries
    /// beyond the retention bound
    ///
    /// # Errors
    /// Fails if the substrate rejects the write
    #[instrument(skip(self, draft), fields(draft_id = %draft.id))]
    pub fn save_draft_snapshot(&self, draft: &Draft) -> Result<DraftSnapshot, ApplicationError> {
        let snapshot = DraftSnapshot::capture(draft);

        let mut snapshots = self.get_draft_snapshots(&draft.id);
        snapshots.push(snapshot.clone());
        if snapshots.len() > self.max_snapshots {
            let excess = snapshots.len() - self.max_snapshots;
            snapshots.drain(..excess);
            debug!(evicted = excess, "Evicted oldest snapshots");
        }

        let payload = serde_json::to_string(&snapshots)?;
        self.store
            .set(&StorageKey::Snapshots(draft.id).to_string(), &payload)?;

        debug!(snapshot_id = %snapshot.id, count = snapshots.len(), "Saved draft snapshot");
        Ok(snapshot)
    }

    /// All retained snapshots of a draft, oldest first
    ///
    /// A missing or corrupt history reads as empty.
    pub fn get_draft_snapshots(&self, draft_id: &DraftId) -> Vec<DraftSnapshot> {
        let key = StorageKey::Snapshots(*draft_id).to_string();
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read snapshots");
                return Vec::new();
            },
        };
        decode_snapshots(&key, &raw)
    }

    /// Look up one snapshot of a draft
    pub fn get_snapshot(&self, draft_id: &DraftId, snapshot_id: &SnapshotId) -> Option<DraftSnapshot> {
        self.get_draft_snapshots(draft_id)
            .into_iter()
            .find(|s| s.id == *snapshot_id)
    }

    /// Number of retained snapshots of a draft
    pub fn count(&self, draft_id: &DraftId) -> usize {
        self.get_draft_snapshots(draft_id).len()
    }
}

/// Parse a stored snapshot list, logging and discarding corrupt payloads
pub(crate) fn decode_snapshots(key: &str, raw: &str) -> Vec<DraftSnapshot> {
    match serde_json::from_str(raw) {
        Ok(snapshots) => snapshots,
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding corrupt snapshot list");
            Vec::new()
        },
    }
}
