//! Observable session state and caller hooks

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::{Draft, DraftConflict, DraftId, SaveStatus};
use serde::Serialize;

/// What a session exposes to its UI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub save_status: SaveStatus,
    /// `updated_at` of the most recent successful save
    pub last_saved_at: Option<DateTime<Utc>>,
    pub snapshot_count: usize,
    /// Set while another tab holds a live lock; cleared only by dismissal
    pub conflict: Option<DraftConflict>,
    /// Message of the last failed write, cleared by the next successful save
    pub last_error: Option<String>,
}

impl SessionStatus {
    pub const fn has_snapshots(&self) -> bool {
        self.snapshot_count > 0
    }

    pub const fn has_conflict(&self) -> bool {
        self.conflict.is_some()
    }
}

type DraftIdHook = Arc<dyn Fn(DraftId) + Send + Sync>;
type ConflictHook = Arc<dyn Fn(&DraftConflict) + Send + Sync>;
type RemoteUpdateHook = Arc<dyn Fn(&Draft) + Send + Sync>;

/// Optional notifications a session sends back to its caller
///
/// Hooks run on whichever task triggered them and never while the session
/// holds its own state lock, so they may call back into the session.
#[derive(Clone, Default)]
pub struct SessionCallbacks {
    pub(super) on_draft_id_change: Option<DraftIdHook>,
    pub(super) on_conflict_detected: Option<ConflictHook>,
    pub(super) on_remote_update: Option<RemoteUpdateHook>,
}

impl std::fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("on_draft_id_change", &self.on_draft_id_change.is_some())
            .field("on_conflict_detected", &self.on_conflict_detected.is_some())
            .field("on_remote_update", &self.on_remote_update.is_some())
            .finish()
    }
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the first save of a new draft allocates its id
    #[must_use]
    pub fn on_draft_id_change(mut self, hook: impl Fn(DraftId) + Send + Sync + 'static) -> Self {
        self.on_draft_id_change = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_conflict_detected(
        mut self,
        hook: impl Fn(&DraftConflict) + Send + Sync + 'static,
    ) -> Self {
        self.on_conflict_detected = Some(Arc::new(hook));
        self
    }

    /// Called when another tab saves the active draft
    #[must_use]
    pub fn on_remote_update(mut self, hook: impl Fn(&Draft) + Send + Sync + 'static) -> Self {
        self.on_remote_update = Some(Arc::new(hook));
        self
    }
}
