//! Substrate key layout
//!
//! Every record this system writes lives under a key namespaced by concern
//! and draft id. The change notifier classifies foreign writes by parsing
//! the key back.

use std::fmt;

use super::ids::DraftId;

/// Prefix of draft content keys
pub const DRAFT_KEY_PREFIX: &str = "draft:";

/// Prefix of lock keys
pub const LOCK_KEY_PREFIX: &str = "draft-lock:";

/// Prefix of snapshot list keys
pub const SNAPSHOTS_KEY_PREFIX: &str = "draft-snapshots:";

/// A key in the shared key-value substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// The draft record itself
    Draft(DraftId),
    /// The advisory editing lock
    Lock(DraftId),
    /// The bounded snapshot history
    Snapshots(DraftId),
}

impl StorageKey {
    /// The draft this key belongs to
    #[must_use]
    pub const fn draft_id(&self) -> DraftId {
        match self {
            Self::Draft(id) | Self::Lock(id) | Self::Snapshots(id) => *id,
        }
    }

    /// Classify a raw substrate key
    ///
    /// Returns `None` for keys this system does not own.
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::{DraftId, StorageKey};
    ///
    /// let id = DraftId::new();
    /// let key = StorageKey::Lock(id).to_string();
    /// assert_eq!(StorageKey::parse(&key), Some(StorageKey::Lock(id)));
    /// assert_eq!(StorageKey::parse("theme"), None);
    /// ```
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(rest) = key.strip_prefix(SNAPSHOTS_KEY_PREFIX) {
            return DraftId::parse(rest).ok().map(Self::Snapshots);
        }
        if let Some(rest) = key.strip_prefix(LOCK_KEY_PREFIX) {
            return DraftId::parse(rest).ok().map(Self::Lock);
        }
        key.strip_prefix(DRAFT_KEY_PREFIX)
            .and_then(|rest| DraftId::parse(rest).ok())
            .map(Self::Draft)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft(id) => write!(f, "{DRAFT_KEY_PREFIX}{id}"),
            Self::Lock(id) => write!(f, "{LOCK_KEY_PREFIX}{id}"),
            Self::Snapshots(id) => write!(f, "{SNAPSHOTS_KEY_PREFIX}{id}"),
        }
    }
}
