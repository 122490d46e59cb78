//! Integration tests for the substrate adapters
//!
//! Draft, lock and snapshot services running over SQLite files and the
//! in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use application::{
    DraftStore, LockManager, SnapshotStore,
    ports::KeyValueStorePort,
};
use domain::{DraftForm, TabId};
use infrastructure::{MemoryStorage, SqliteStorage, StorageBackend, StorageConfig};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn file_config(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Sqlite,
        path: dir.path().join("draftsync.db").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    }
}

fn ttl() -> chrono::Duration {
    chrono::Duration::seconds(90)
}

// ============================================================================
// SQLite Tests
// ============================================================================

mod sqlite_tests {
    use super::*;

    #[test]
    fn drafts_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = file_config(&dir);

        let saved = {
            let storage = SqliteStorage::open(&config).expect("open");
            let drafts = DraftStore::new(Arc::new(storage.context()));
            drafts
                .save_draft(None, &DraftForm::new("Durable", "body").with_tags("rust, sqlite"))
                .expect("save")
        };

        let storage = SqliteStorage::open(&config).expect("reopen");
        let drafts = DraftStore::new(Arc::new(storage.context()));
        assert_eq!(drafts.get_draft(&saved.id), Some(saved.clone()));
        assert_eq!(drafts.list_drafts(), vec![saved]);
    }

    #[test]
    fn lock_conflicts_across_contexts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::open(&file_config(&dir)).expect("open");
        let tab_a = LockManager::new(Arc::new(storage.context()), TabId::new(), ttl());
        let tab_b = LockManager::new(Arc::new(storage.context()), TabId::new(), ttl());

        let drafts = DraftStore::new(Arc::new(storage.context()));
        let draft = drafts.save_draft(None, &DraftForm::new("t", "c")).expect("save");

        assert!(!tab_a.check_draft_conflict(&draft.id).has_conflict);
        tab_a.set_draft_lock(&draft.id).expect("lock");

        let check = tab_b.check_draft_conflict(&draft.id);
        assert!(check.has_conflict);
        assert_eq!(check.lock.map(|l| l.tab_id), Some(tab_a.tab_id()));

        assert!(!tab_b.release_draft_lock(&draft.id).expect("release"));
        assert!(tab_a.release_draft_lock(&draft.id).expect("release"));
        assert!(!tab_b.check_draft_conflict(&draft.id).has_conflict);
    }

    #[test]
    fn snapshot_retention_is_enforced_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::open(&file_config(&dir)).expect("open");
        let ctx: Arc<dyn KeyValueStorePort> = Arc::new(storage.context());
        let drafts = DraftStore::new(Arc::clone(&ctx));
        let snapshots = SnapshotStore::new(ctx, 3);

        let mut draft = drafts.save_draft(None, &DraftForm::new("v0", "c")).expect("save");
        for i in 1..=5 {
            draft = drafts
                .save_draft(Some(draft.id), &DraftForm::new(format!("v{i}"), "c"))
                .expect("save");
            snapshots.save_draft_snapshot(&draft).expect("snapshot");
        }

        let titles: Vec<_> = snapshots
            .get_draft_snapshots(&draft.id)
            .into_iter()
            .map(|s| s.draft.title)
            .collect();
        assert_eq!(titles, ["v3", "v4", "v5"]);
    }
}

// ============================================================================
// Adapter Equivalence
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Set(String, String),
    Remove(String),
}

fn op() -> impl Strategy<Value = Op> {
    let key = prop::sample::select(vec!["draft:a", "draft:b", "draft-lock:a", "other"]);
    prop_oneof![
        (key.clone(), "[a-z]{0,4}").prop_map(|(k, v)| Op::Set(k.to_string(), v)),
        key.prop_map(|k| Op::Remove(k.to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn memory_and_sqlite_agree(ops in prop::collection::vec(op(), 0..30)) {
        let memory = MemoryStorage::new().context();
        let sqlite = SqliteStorage::open(&StorageConfig {
            path: ":memory:".to_string(),
            ..StorageConfig::default()
        })
        .unwrap()
        .context();

        for op in &ops {
            match op {
                Op::Set(k, v) => {
                    memory.set(k, v).unwrap();
                    sqlite.set(k, v).unwrap();
                },
                Op::Remove(k) => {
                    memory.remove(k).unwrap();
                    sqlite.remove(k).unwrap();
                },
            }
        }

        prop_assert_eq!(memory.keys("").unwrap(), sqlite.keys("").unwrap());
        for key in memory.keys("").unwrap() {
            prop_assert_eq!(memory.get(&key).unwrap(), sqlite.get(&key).unwrap());
        }
    }
}
