//! Lock Manager - advisory, liveness-based editing locks
//!
//! Each draft has at most one lock entry in the substrate. A session writes
//! its own tab id there when it starts editing and re-writes it periodically.
//! Another tab sees a conflict only while that entry is younger than the
//! lock TTL, so a crashed tab cannot lock a draft forever.
//!
//! Two tabs checking at the same moment can both see "no conflict" and both
//! take the lock; the substrate has no compare-and-swap, so this window is
//! left open. The next lock write from either tab reaches the other as a
//! `LockAcquired` event and puts it into conflict.

use std::sync::Arc;

use chrono::Utc;
use domain::{ConflictCheck, DraftId, DraftLock, StorageKey, TabId};
use tracing::{debug, info, instrument, warn};

use crate::{error::ApplicationError, ports::KeyValueStorePort};

/// Acquires, refreshes, releases and inspects draft locks for one tab
pub struct LockManager {
    store: Arc<dyn KeyValueStorePort>,
    tab_id: TabId,
    lock_ttl: chrono::Duration,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("tab_id", &self.tab_id)
            .field("lock_ttl", &self.lock_ttl)
            .finish_non_exhaustive()
    }
}

impl LockManager {
    /// Create a lock manager acting as `tab_id`
    pub fn new(
        store: Arc<dyn KeyValueStorePort>,
        tab_id: TabId,
        lock_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            tab_id,
            lock_ttl,
        }
    }

    /// Identity this manager writes into locks
    pub const fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub const fn lock_ttl(&self) -> chrono::Duration {
        self.lock_ttl
    }

    /// Write (or overwrite) the lock as held by this tab, timestamped now
    ///
    /// Used for first acquisition, periodic refresh and takeover alike.
    ///
    /// # Errors
    /// Fails if the substrate rejects the write
    #[instrument(skip(self), fields(draft_id = %draft_id, tab_id = %self.tab_id))]
    pub fn set_draft_lock(&self, draft_id: &DraftId) -> Result<DraftLock, ApplicationError> {
        let lock = DraftLock::new(*draft_id, self.tab_id);
        let payload = serde_json::to_string(&lock)?;
        self.store.set(&StorageKey::Lock(*draft_id).to_string(), &payload)?;
        debug!("Wrote draft lock");
        Ok(lock)
    }

    /// Remove the lock if this tab holds it
    ///
    /// Returns whether an entry was removed. A lock held by another tab is
    /// left untouched.
    ///
    /// # Errors
    /// Fails if the substrate rejects the removal
    #[instrument(skip(self), fields(draft_id = %draft_id, tab_id = %self.tab_id))]
    pub fn release_draft_lock(&self, draft_id: &DraftId) -> Result<bool, ApplicationError> {
        match self.get_draft_lock(draft_id) {
            Some(lock) if lock.is_owned_by(&self.tab_id) => {
                self.store.remove(&StorageKey::Lock(*draft_id).to_string())?;
                info!("Released draft lock");
                Ok(true)
            },
            Some(lock) => {
                debug!(holder = %lock.tab_id, "Lock held by another tab, not releasing");
                Ok(false)
            },
            None => Ok(false),
        }
    }

    /// Check whether another tab holds a live lock on the draft
    #[instrument(skip(self), fields(draft_id = %draft_id, tab_id = %self.tab_id))]
    pub fn check_draft_conflict(&self, draft_id: &DraftId) -> ConflictCheck {
        let Some(lock) = self.get_draft_lock(draft_id) else {
            return ConflictCheck::clear();
        };

        let has_conflict = lock.conflicts_with(&self.tab_id, Utc::now(), self.lock_ttl);
        if has_conflict {
            info!(holder = %lock.tab_id, "Draft is locked by another tab");
        }
        ConflictCheck {
            has_conflict,
            lock: Some(lock),
        }
    }

    /// Read the stored lock; `None` when missing or corrupt
    pub fn get_draft_lock(&self, draft_id: &DraftId) -> Option<DraftLock> {
        let key = StorageKey::Lock(*draft_id).to_string();
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read draft lock");
                return None;
            },
        };
        match serde_json::from_str(&raw) {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding corrupt lock payload");
                None
            },
        }
    }
}
