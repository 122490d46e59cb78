//! Cross-Tab Change Notifier
//!
//! Turns raw substrate notifications into [`StorageChangeEvent`]s for one
//! draft. Keys this subsystem does not own, and keys of other drafts, are
//! dropped.

use std::sync::Arc;

use domain::{DraftId, StorageChangeEvent, StorageKey};
use tracing::{trace, warn};

use crate::{
    ports::{ChangeListener, KeyChange, KeyValueStorePort, Subscription},
    services::{draft_store::decode_draft, snapshot_store::decode_snapshots},
};

/// Re-dispatches substrate changes as typed per-draft events
pub struct ChangeNotifier {
    store: Arc<dyn KeyValueStorePort>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier").finish_non_exhaustive()
    }
}

impl ChangeNotifier {
    pub fn new(store: Arc<dyn KeyValueStorePort>) -> Self {
        Self { store }
    }

    /// Deliver events concerning `draft_id` to `handler` until the returned
    /// guard is dropped
    pub fn subscribe<F>(&self, draft_id: DraftId, handler: F) -> Subscription
    where
        F: Fn(StorageChangeEvent) + Send + Sync + 'static,
    {
        let listener: ChangeListener = Arc::new(move |change: &KeyChange| {
            if let Some(event) = decode_change(change).filter(|e| e.draft_id() == draft_id) {
                trace!(draft_id = %draft_id, kind = event.kind(), "Cross-tab event");
                handler(event);
            }
        });
        self.store.subscribe(listener)
    }

    /// Deliver events for every draft
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(StorageChangeEvent) + Send + Sync + 'static,
    {
        let listener: ChangeListener = Arc::new(move |change: &KeyChange| {
            if let Some(event) = decode_change(change) {
                handler(event);
            }
        });
        self.store.subscribe(listener)
    }
}

/// Classify one substrate change; `None` for foreign keys and corrupt payloads
pub fn decode_change(change: &KeyChange) -> Option<StorageChangeEvent> {
    let key = StorageKey::parse(&change.key)?;
    let draft_id = key.draft_id();

    match (key, change.new_value.as_deref()) {
        (StorageKey::Draft(_), None) => Some(StorageChangeEvent::DraftRemoved { draft_id }),
        (StorageKey::Draft(_), Some(raw)) => {
            decode_draft(&change.key, raw).map(|draft| StorageChangeEvent::DraftUpdated {
                draft: Box::new(draft),
            })
        },
        (StorageKey::Lock(_), None) => Some(StorageChangeEvent::LockReleased { draft_id }),
        (StorageKey::Lock(_), Some(raw)) => match serde_json::from_str(raw) {
            Ok(lock) => Some(StorageChangeEvent::LockAcquired { lock }),
            Err(e) => {
                warn!(key = %change.key, error = %e, "Ignoring corrupt lock notification");
                None
            },
        },
        (StorageKey::Snapshots(_), raw) => Some(StorageChangeEvent::SnapshotsChanged {
            draft_id,
            count: raw.map_or(0, |raw| decode_snapshots(&change.key, raw).len()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::{Draft, DraftForm, DraftLock, DraftSnapshot, TabId};
    use parking_lot::Mutex;

    use super::*;
    use crate::testing::FakeStore;

    fn draft(id: DraftId) -> Draft {
        let now = Utc::now();
        Draft::from_form(id, &DraftForm::new("remote", "body"), now, now)
    }

    fn collect(notifier: &ChangeNotifier, id: DraftId) -> (Subscription, Arc<Mutex<Vec<StorageChangeEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = notifier.subscribe(id, move |e| sink.lock().push(e));
        (sub, seen)
    }

    #[test]
    fn decodes_every_key_kind() {
        let fake = FakeStore::new();
        let notifier = ChangeNotifier::new(fake.clone());
        let id = DraftId::new();
        let (_sub, seen) = collect(&notifier, id);

        let d = draft(id);
        let lock = DraftLock::new(id, TabId::new());
        let snaps = vec![DraftSnapshot::capture(&d), DraftSnapshot::capture(&d)];

        fake.foreign_set(&StorageKey::Draft(id).to_string(), &serde_json::to_string(&d).unwrap());
        fake.foreign_set(&StorageKey::Lock(id).to_string(), &serde_json::to_string(&lock).unwrap());
        fake.foreign_set(
            &StorageKey::Snapshots(id).to_string(),
            &serde_json::to_string(&snaps).unwrap(),
        );
        fake.foreign_remove(&StorageKey::Lock(id).to_string());
        fake.foreign_remove(&StorageKey::Draft(id).to_string());

        let seen = seen.lock();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], StorageChangeEvent::DraftUpdated { draft: Box::new(d) });
        assert_eq!(seen[1], StorageChangeEvent::LockAcquired { lock });
        assert_eq!(seen[2], StorageChangeEvent::SnapshotsChanged { draft_id: id, count: 2 });
        assert_eq!(seen[3], StorageChangeEvent::LockReleased { draft_id: id });
        assert_eq!(seen[4], StorageChangeEvent::DraftRemoved { draft_id: id });
    }

    #[test]
    fn other_drafts_and_foreign_keys_are_filtered() {
        let fake = FakeStore::new();
        let notifier = ChangeNotifier::new(fake.clone());
        let id = DraftId::new();
        let (_sub, seen) = collect(&notifier, id);

        let other = DraftId::new();
        fake.foreign_set(
            &StorageKey::Lock(other).to_string(),
            &serde_json::to_string(&DraftLock::new(other, TabId::new())).unwrap(),
        );
        fake.foreign_set("theme", "dark");
        fake.foreign_set("draft:nope", "{}");

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn corrupt_payloads_are_skipped() {
        let fake = FakeStore::new();
        let notifier = ChangeNotifier::new(fake.clone());
        let id = DraftId::new();
        let (_sub, seen) = collect(&notifier, id);

        fake.foreign_set(&StorageKey::Draft(id).to_string(), "not json");
        fake.foreign_set(&StorageKey::Lock(id).to_string(), "42");

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let fake = FakeStore::new();
        let notifier = ChangeNotifier::new(fake.clone());
        let id = DraftId::new();
        let (sub, seen) = collect(&notifier, id);
        assert_eq!(fake.listener_count(), 1);

        drop(sub);
        assert_eq!(fake.listener_count(), 0);
        fake.foreign_remove(&StorageKey::Lock(id).to_string());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn subscribe_all_sees_every_draft() {
        let fake = FakeStore::new();
        let notifier = ChangeNotifier::new(fake.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = notifier.subscribe_all(move |e| sink.lock().push(e.draft_id()));

        let (a, b) = (DraftId::new(), DraftId::new());
        fake.foreign_remove(&StorageKey::Lock(a).to_string());
        fake.foreign_remove(&StorageKey::Lock(b).to_string());

        assert_eq!(*seen.lock(), vec![a, b]);
    }

    #[test]
    fn removed_snapshot_list_counts_zero() {
        let id = DraftId::new();
        let change = KeyChange {
            key: StorageKey::Snapshots(id).to_string(),
            new_value: None,
            old_value: Some("[]".into()),
        };
        assert_eq!(
            decode_change(&change),
            Some(StorageChangeEvent::SnapshotsChanged { draft_id: id, count: 0 })
        );
    }
}
