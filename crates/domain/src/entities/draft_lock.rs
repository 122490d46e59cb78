//! Advisory editing lock on a draft
//!
//! A lock is a liveness claim, not a mutex. It names the tab that last
//! refreshed it and when; other tabs treat it as binding only while it is
//! younger than the lock TTL. A tab that crashes simply stops refreshing and
//! its claim lapses.
//!
//! Time is always passed in so the checks stay deterministic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{DraftId, TabId};

/// A liveness claim by one tab over one draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLock {
    pub draft_id: DraftId,
    pub tab_id: TabId,
    /// Last refresh time
    pub timestamp: DateTime<Utc>,
}

impl DraftLock {
    /// A lock held by `tab_id`, refreshed now
    pub fn new(draft_id: DraftId, tab_id: TabId) -> Self {
        Self::at(draft_id, tab_id, Utc::now())
    }

    /// A lock with an explicit refresh time
    pub const fn at(draft_id: DraftId, tab_id: TabId, timestamp: DateTime<Utc>) -> Self {
        Self {
            draft_id,
            tab_id,
            timestamp,
        }
    }

    /// Whether the lock is still live: `now - timestamp < ttl`
    pub fn is_live_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.timestamp) < ttl
    }

    pub fn is_owned_by(&self, tab_id: &TabId) -> bool {
        self.tab_id == *tab_id
    }

    /// Whether this lock blocks `tab_id` from editing
    ///
    /// Only a live lock held by a different tab conflicts. An expired foreign
    /// lock counts as absent.
    pub fn conflicts_with(&self, tab_id: &TabId, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.is_owned_by(tab_id) && self.is_live_at(now, ttl)
    }

    /// Time left before the lock lapses, if any
    pub fn remaining_at(&self, now: DateTime<Utc>, ttl: Duration) -> Option<Duration> {
        let remaining = ttl - now.signed_duration_since(self.timestamp);
        (remaining > Duration::zero()).then_some(remaining)
    }
}
