//! Value Objects - Immutable, identity-less domain primitives

mod ids;
mod save_status;
mod storage_key;
mod tags;

pub use ids::{DraftId, SnapshotId, TabId};
pub use save_status::SaveStatus;
pub use storage_key::{DRAFT_KEY_PREFIX, LOCK_KEY_PREFIX, SNAPSHOTS_KEY_PREFIX, StorageKey};
pub use tags::Tags;
