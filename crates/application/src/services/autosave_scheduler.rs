//! Autosave Scheduler - debounced draft persistence
//!
//! At most one save is pending per scheduler. Scheduling again before the
//! quiet window elapses replaces the pending save and restarts the timer, so a
//! burst of edits ends in exactly one write carrying the last form.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use domain::{Draft, DraftForm, DraftId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{error::ApplicationError, services::DraftStore};

/// Outcome of a fired autosave
pub type SaveResult = Result<Draft, ApplicationError>;

struct PendingSave {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Debounces form changes into single writes through a [`DraftStore`]
pub struct AutosaveScheduler {
    drafts: Arc<DraftStore>,
    debounce: Duration,
    pending: Arc<Mutex<Option<PendingSave>>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("debounce", &self.debounce)
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

impl AutosaveScheduler {
    pub fn new(drafts: Arc<DraftStore>, debounce: Duration) -> Self {
        Self {
            drafts,
            debounce,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Save `form` once the debounce window passes without another call
    ///
    /// `on_saved` runs exactly once if this save fires, and never if it is
    /// superseded or cancelled. Must be called from within a tokio runtime.
    pub fn schedule_auto_save<F>(&self, id: Option<DraftId>, form: DraftForm, on_saved: F)
    where
        F: FnOnce(SaveResult) + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let drafts = Arc::clone(&self.drafts);
        let pending = Arc::clone(&self.pending);
        let debounce = self.debounce;

        // Held across spawn so the task cannot observe the slot before it is filled
        let mut slot = self.pending.lock();
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            debug!("Autosave debounce reset");
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            {
                let mut slot = pending.lock();
                match slot.as_ref() {
                    Some(current) if current.generation == generation => *slot = None,
                    _ => return,
                }
            }

            let result = drafts.save_draft(id, &form);
            match &result {
                Ok(draft) => debug!(draft_id = %draft.id, "Autosave completed"),
                Err(e) => warn!(draft_id = ?id, error = %e, "Autosave failed"),
            }
            on_saved(result);
        });

        *slot = Some(PendingSave { generation, handle });
    }

    /// Drop the pending save, if any; returns whether one was pending
    pub fn cancel_auto_save(&self) -> bool {
        match self.pending.lock().take() {
            Some(previous) => {
                previous.handle.abort();
                debug!("Autosave cancelled");
                true
            },
            None => false,
        }
    }

    /// Whether a save is waiting for its debounce window
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.handle.abort();
        }
    }
}
