//! Draft Store - CRUD over draft records in the shared substrate
//!
//! Owns id allocation and timestamps. Corrupt or unreadable records are
//! reported as absent rather than as errors.

use std::sync::Arc;

use chrono::Utc;
use domain::{DRAFT_KEY_PREFIX, Draft, DraftForm, DraftId, StorageKey};
use tracing::{debug, instrument, warn};

use crate::{error::ApplicationError, ports::KeyValueStorePort};

/// Persists and loads drafts
pub struct DraftStore {
    store: Arc<dyn KeyValueStorePort>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore").finish_non_exhaustive()
    }
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStorePort>) -> Self {
        Self { store }
    }

    /// Save form data as a draft
    ///
    /// Without an `id` a new draft is allocated. With an `id` the stored
    /// `created_at` is kept and `updated_at` is set to now, but never earlier
    /// than the stored value.
    ///
    /// # Errors
    /// Fails if the form does not validate, or the substrate rejects the write
    #[instrument(skip(self, form), fields(draft_id = ?id))]
    pub fn save_draft(
        &self,
        id: Option<DraftId>,
        form: &DraftForm,
    ) -> Result<Draft, ApplicationError> {
        form.validate_form()?;

        let now = Utc::now();
        let (id, created_at, updated_at) = match id {
            Some(id) => match self.get_draft(&id) {
                Some(existing) => (id, existing.created_at, now.max(existing.updated_at)),
                None => (id, now, now),
            },
            None => (DraftId::new(), now, now),
        };

        let draft = Draft::from_form(id, form, created_at, updated_at);
        let payload = serde_json::to_string(&draft)?;
        self.store.set(&StorageKey::Draft(id).to_string(), &payload)?;

        debug!(draft_id = %id, "Saved draft");
        Ok(draft)
    }

    /// Load a draft; `None` when missing, unreadable or corrupt
    #[instrument(skip(self), fields(draft_id = %id))]
    pub fn get_draft(&self, id: &DraftId) -> Option<Draft> {
        let key = StorageKey::Draft(*id).to_string();
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read draft");
                return None;
            },
        };
        decode_draft(&key, &raw)
    }

    /// Every readable draft, most recently updated first
    #[instrument(skip(self))]
    pub fn list_drafts(&self) -> Vec<Draft> {
        let keys = match self.store.keys(DRAFT_KEY_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list draft keys");
                return Vec::new();
            },
        };

        let mut drafts: Vec<Draft> = keys
            .iter()
            .filter(|key| matches!(StorageKey::parse(key), Some(StorageKey::Draft(_))))
            .filter_map(|key| match self.store.get(key) {
                Ok(raw) => raw.and_then(|raw| decode_draft(key, &raw)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read draft");
                    None
                },
            })
            .collect();

        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        debug!(count = drafts.len(), "Listed drafts");
        drafts
    }
}

/// Parse a stored draft, logging and discarding corrupt payloads
pub(crate) fn decode_draft(key: &str, raw: &str) -> Option<Draft> {
    match serde_json::from_str(raw) {
        Ok(draft) => Some(draft),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding corrupt draft payload");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;
    use crate::{ports::MockKeyValueStorePort, testing::FakeStore};

    fn create_test_store() -> (DraftStore, Arc<FakeStore>) {
        let fake = FakeStore::new();
        (DraftStore::new(fake.clone()), fake)
    }

    fn form(title: &str) -> DraftForm {
        DraftForm::new(title, "Body text").with_tags("a, b")
    }

    #[test]
    fn save_without_id_allocates_one() {
        let (store, _) = create_test_store();
        let first = store.save_draft(None, &form("One")).unwrap();
        let second = store.save_draft(None, &form("Two")).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[test]
    fn save_then_get_returns_saved_record() {
        let (store, _) = create_test_store();
        let saved = store.save_draft(None, &form("Hello")).unwrap();
        let loaded = store.get_draft(&saved.id).unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.tags.as_slice(), ["a", "b"]);
    }

    #[test]
    fn resave_keeps_id_and_created_at() {
        let (store, _) = create_test_store();
        let first = store.save_draft(None, &form("v1")).unwrap();
        let second = store.save_draft(Some(first.id), &form("v2")).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.get_draft(&first.id).unwrap().title, "v2");
    }

    #[test]
    fn updated_at_never_goes_backwards() {
        let (store, fake) = create_test_store();
        let saved = store.save_draft(None, &form("v1")).unwrap();

        // Simulate a record written by a tab whose clock runs ahead
        let mut ahead = saved.clone();
        ahead.updated_at = Utc::now() + Duration::hours(1);
        fake.seed(
            &StorageKey::Draft(saved.id).to_string(),
            &serde_json::to_string(&ahead).unwrap(),
        );

        let resaved = store.save_draft(Some(saved.id), &form("v2")).unwrap();
        assert_eq!(resaved.updated_at, ahead.updated_at);
    }

    #[test]
    fn save_with_unknown_id_creates_record_under_that_id() {
        let (store, _) = create_test_store();
        let id = DraftId::new();
        let saved = store.save_draft(Some(id), &form("Adopted")).unwrap();
        assert_eq!(saved.id, id);
        assert!(store.get_draft(&id).is_some());
    }

    #[test]
    fn get_missing_draft_returns_none() {
        let (store, _) = create_test_store();
        assert!(store.get_draft(&DraftId::new()).is_none());
    }

    #[test]
    fn corrupt_payload_is_treated_as_absent() {
        let (store, fake) = create_test_store();
        let id = DraftId::new();
        fake.seed(&StorageKey::Draft(id).to_string(), "{not json");
        assert!(store.get_draft(&id).is_none());
    }

    #[test]
    fn invalid_form_is_rejected_without_writing() {
        let (store, fake) = create_test_store();
        let result = store.save_draft(None, &form("Paid").paid(-5.0));
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
        assert_eq!(fake.write_count(DRAFT_KEY_PREFIX), 0);
    }

    #[test]
    fn write_failure_propagates() {
        let (store, fake) = create_test_store();
        fake.fail_writes(true);
        let result = store.save_draft(None, &form("x"));
        assert!(matches!(result, Err(ApplicationError::Storage(_))));
    }

    #[test]
    fn read_failure_is_treated_as_absent() {
        let mut mock = MockKeyValueStorePort::new();
        mock.expect_get()
            .returning(|_| Err(ApplicationError::Storage("disabled".into())));
        let store = DraftStore::new(Arc::new(mock));
        assert!(store.get_draft(&DraftId::new()).is_none());
    }

    #[test]
    fn quota_failure_surfaces_from_substrate() {
        let mut mock = MockKeyValueStorePort::new();
        mock.expect_get().returning(|_| Ok(None));
        mock.expect_set()
            .times(1)
            .returning(|_, _| Err(ApplicationError::QuotaExceeded { limit_bytes: 1024 }));
        let store = DraftStore::new(Arc::new(mock));

        let err = store.save_draft(None, &form("big")).unwrap_err();
        assert!(err.is_storage_failure());
    }

    #[test]
    fn list_drafts_is_newest_first_and_skips_corrupt() {
        let (store, fake) = create_test_store();
        let older = store.save_draft(None, &form("older")).unwrap();
        let mut newer = store.save_draft(None, &form("newer")).unwrap();
        newer.updated_at = older.updated_at + Duration::seconds(5);
        fake.seed(
            &StorageKey::Draft(newer.id).to_string(),
            &serde_json::to_string(&newer).unwrap(),
        );
        fake.seed(&StorageKey::Draft(DraftId::new()).to_string(), "garbage");
        fake.seed("draft:not-an-id", "{}");

        let listed = store.list_drafts();
        let titles: Vec<_> = listed.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["newer", "older"]);
    }

    #[test]
    fn list_ignores_locks_and_snapshots() {
        let (store, fake) = create_test_store();
        let saved = store.save_draft(None, &form("only")).unwrap();
        fake.seed(&StorageKey::Lock(saved.id).to_string(), "{}");
        fake.seed(&StorageKey::Snapshots(saved.id).to_string(), "[]");
        assert_eq!(store.list_drafts().len(), 1);
    }

    proptest! {
        #[test]
        fn repeated_saves_keep_updated_at_monotonic(titles in proptest::collection::vec("[a-z]{1,8}", 1..10)) {
            let (store, _) = create_test_store();
            let mut id = None;
            let mut last = None;
            for title in titles {
                let saved = store.save_draft(id, &form(&title)).unwrap();
                if let Some(prev) = last {
                    prop_assert!(saved.updated_at >= prev);
                }
                id = Some(saved.id);
                last = Some(saved.updated_at);
            }
        }
    }
}
