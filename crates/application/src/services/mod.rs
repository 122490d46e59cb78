//! Application services - Use case implementations

mod autosave_scheduler;
mod change_notifier;
mod draft_session;
mod draft_store;
mod lock_manager;
mod snapshot_store;

pub use autosave_scheduler::{AutosaveScheduler, SaveResult};
pub use change_notifier::{ChangeNotifier, decode_change};
pub use draft_session::{DraftServices, DraftSession, SessionCallbacks, SessionStatus};
pub use draft_store::DraftStore;
pub use lock_manager::LockManager;
pub use snapshot_store::SnapshotStore;
