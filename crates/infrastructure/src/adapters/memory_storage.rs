//! In-process shared substrate
//!
//! [`MemoryStorage`] is one origin's store; each [`MemoryStorageContext`] is
//! one tab looking at it. Contexts share entries and announce their writes to
//! each other, never to themselves.

use std::{collections::BTreeMap, sync::Arc};

use application::{
    error::ApplicationError,
    ports::{ChangeListener, KeyChange, KeyValueStorePort, Subscription},
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::listener_registry::{ContextId, ListenerRegistry};

struct Shared {
    entries: RwLock<BTreeMap<String, String>>,
    registry: ListenerRegistry,
    quota_bytes: Option<usize>,
}

/// Origin-scoped in-memory key-value store
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .field("quota_bytes", &self.shared.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// An unbounded store
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A store that rejects writes once keys plus values exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self::build(Some(quota_bytes))
    }

    fn build(quota_bytes: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(BTreeMap::new()),
                registry: ListenerRegistry::new(),
                quota_bytes,
            }),
        }
    }

    /// Open a new execution context on this store
    pub fn context(&self) -> MemoryStorageContext {
        MemoryStorageContext {
            shared: Arc::clone(&self.shared),
            id: self.shared.registry.next_context(),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes counted against the quota
    pub fn used_bytes(&self) -> usize {
        entries_size(&self.shared.entries.read())
    }
}

fn entries_size(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// One tab's view of a [`MemoryStorage`]
pub struct MemoryStorageContext {
    shared: Arc<Shared>,
    id: ContextId,
}

impl std::fmt::Debug for MemoryStorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorageContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl MemoryStorageContext {
    pub const fn id(&self) -> ContextId {
        self.id
    }
}

impl KeyValueStorePort for MemoryStorageContext {
    fn get(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        Ok(self.shared.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApplicationError> {
        let old_value = {
            let mut entries = self.shared.entries.write();
            let old_value = entries.get(key).cloned();
            if old_value.as_deref() == Some(value) {
                return Ok(());
            }

            if let Some(limit_bytes) = self.shared.quota_bytes {
                let replaced = old_value.as_ref().map_or(0, |old| key.len() + old.len());
                let projected = entries_size(&entries) - replaced + key.len() + value.len();
                if projected > limit_bytes {
                    warn!(key = %key, projected, limit_bytes, "Storage quota exceeded");
                    return Err(ApplicationError::QuotaExceeded { limit_bytes });
                }
            }

            entries.insert(key.to_string(), value.to_string());
            old_value
        };

        debug!(key = %key, context = self.id, "Stored entry");
        self.shared.registry.dispatch(
            self.id,
            &KeyChange {
                key: key.to_string(),
                new_value: Some(value.to_string()),
                old_value,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApplicationError> {
        let Some(old_value) = self.shared.entries.write().remove(key) else {
            return Ok(());
        };

        debug!(key = %key, context = self.id, "Removed entry");
        self.shared.registry.dispatch(
            self.id,
            &KeyChange {
                key: key.to_string(),
                new_value: None,
                old_value: Some(old_value),
            },
        );
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, ApplicationError> {
        Ok(self
            .shared
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.shared.registry.register(self.id, listener)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    fn recorder(ctx: &MemoryStorageContext) -> (Subscription, Arc<Mutex<Vec<KeyChange>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = ctx.subscribe(Arc::new(move |c: &KeyChange| sink.lock().push(c.clone())));
        (sub, seen)
    }

    #[test]
    fn contexts_share_entries() {
        let storage = MemoryStorage::new();
        let (a, b) = (storage.context(), storage.context());

        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn writes_notify_other_contexts_only() {
        let storage = MemoryStorage::new();
        let (a, b) = (storage.context(), storage.context());
        let (_sa, seen_a) = recorder(&a);
        let (_sb, seen_b) = recorder(&b);

        a.set("k", "v1").unwrap();
        a.set("k", "v2").unwrap();
        a.remove("k").unwrap();

        assert!(seen_a.lock().is_empty());
        let seen = seen_b.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].old_value.as_deref(), Some("v1"));
        assert_eq!(seen[1].new_value.as_deref(), Some("v2"));
        assert!(seen[2].is_removal());
    }

    #[test]
    fn unchanged_value_and_missing_removal_are_silent() {
        let storage = MemoryStorage::new();
        let (a, b) = (storage.context(), storage.context());
        let (_sb, seen) = recorder(&b);

        a.set("k", "v").unwrap();
        a.set("k", "v").unwrap();
        a.remove("absent").unwrap();

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn keys_are_prefix_filtered_and_sorted() {
        let storage = MemoryStorage::new();
        let ctx = storage.context();
        for key in ["draft:b", "draft:a", "draft-lock:a", "other"] {
            ctx.set(key, "x").unwrap();
        }

        assert_eq!(ctx.keys("draft:").unwrap(), ["draft:a", "draft:b"]);
        assert_eq!(ctx.keys("").unwrap().len(), 4);
    }

    #[test]
    fn quota_rejects_oversized_write() {
        let storage = MemoryStorage::with_quota(10);
        let ctx = storage.context();

        ctx.set("k", "12345").unwrap();
        let err = ctx.set("j", "123456789").unwrap_err();
        assert!(matches!(err, ApplicationError::QuotaExceeded { limit_bytes: 10 }));
        assert!(ctx.get("j").unwrap().is_none());
    }

    #[test]
    fn quota_counts_replacement_not_addition() {
        let storage = MemoryStorage::with_quota(10);
        let ctx = storage.context();

        ctx.set("k", "123456789").unwrap();
        ctx.set("k", "987654321").unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }
}
