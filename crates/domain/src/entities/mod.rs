//! Domain entities - Objects with identity and lifecycle

mod draft;
mod draft_conflict;
mod draft_lock;
mod draft_snapshot;

pub use draft::{Draft, DraftForm};
pub use draft_conflict::{ConflictCheck, DraftConflict};
pub use draft_lock::DraftLock;
pub use draft_snapshot::DraftSnapshot;
