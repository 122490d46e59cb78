//! Draft Session - one editing session over one draft
//!
//! Wires the draft store, lock manager, snapshot store, autosave scheduler and
//! change notifier into the `idle -> saving -> saved -> idle` cycle, with a
//! parallel `conflict` state entered whenever another tab holds a live lock on
//! the active draft and left only through [`DraftSession::dismiss_conflict`].
//!
//! A session owns three background tasks (cross-tab events, lock refresh,
//! periodic snapshots) plus the autosave and "saved" display timers. All of
//! them stop on [`DraftSession::teardown`], which also runs on drop.
//!
//! The state mutex is never held across a substrate write or a caller hook.

mod status;


use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use domain::{
    Draft, DraftConflict, DraftForm, DraftId, DraftSnapshot, SaveStatus, SnapshotId,
    StorageChangeEvent, TabId,
};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

pub use self::status::{SessionCallbacks, SessionStatus};
use crate::{
    error::ApplicationError,
    ports::{KeyValueStorePort, Subscription},
    services::{AutosaveScheduler, ChangeNotifier, DraftStore, LockManager, SnapshotStore},
    settings::DraftSyncSettings,
};

/// The per-tab services a session composes
#[derive(Debug, Clone)]
pub struct DraftServices {
    pub drafts: Arc<DraftStore>,
    pub locks: Arc<LockManager>,
    pub snapshots: Arc<SnapshotStore>,
    pub notifier: Arc<ChangeNotifier>,
}

impl DraftServices {
    /// Build every service over one substrate context acting as `tab_id`
    pub fn new(
        store: Arc<dyn KeyValueStorePort>,
        tab_id: TabId,
        settings: &DraftSyncSettings,
    ) -> Self {
        Self {
            drafts: Arc::new(DraftStore::new(Arc::clone(&store))),
            locks: Arc::new(LockManager::new(
                Arc::clone(&store),
                tab_id,
                settings.lock_ttl_chrono(),
            )),
            snapshots: Arc::new(SnapshotStore::new(Arc::clone(&store), settings.max_snapshots)),
            notifier: Arc::new(ChangeNotifier::new(store)),
        }
    }
}

#[derive(Default)]
struct SessionState {
    draft_id: Option<DraftId>,
    form: DraftForm,
    status: SessionStatus,
    subscription: Option<Subscription>,
    saved_generation: u64,
    revert: Option<JoinHandle<()>>,
}

impl SessionState {
    fn in_conflict(&self) -> bool {
        self.status.has_conflict()
    }
}

struct SessionInner {
    services: DraftServices,
    settings: DraftSyncSettings,
    callbacks: SessionCallbacks,
    autosave: AutosaveScheduler,
    state: Mutex<SessionState>,
    status: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<StorageChangeEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

/// Handle to a running editing session
///
/// Dropping the handle tears the session down.
pub struct DraftSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for DraftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftSession")
            .field("tab_id", &self.tab_id())
            .field("draft_id", &self.draft_id())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl DraftSession {
    /// Start a session, optionally on an existing draft
    ///
    /// With a `draft_id` the stored draft is loaded into the form and session
    /// start runs immediately: a live foreign lock puts the session into
    /// conflict, otherwise this tab takes the lock. Must be called from within
    /// a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Configuration`] when `settings` fail
    /// validation, such as a zero refresh or snapshot interval.
    pub fn start(
        services: DraftServices,
        settings: DraftSyncSettings,
        callbacks: SessionCallbacks,
        draft_id: Option<DraftId>,
    ) -> Result<Self, ApplicationError> {
        settings.validate()?;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::default());
        let autosave =
            AutosaveScheduler::new(Arc::clone(&services.drafts), settings.autosave_debounce);

        let inner = Arc::new(SessionInner {
            services,
            settings,
            callbacks,
            autosave,
            state: Mutex::new(SessionState::default()),
            status,
            events: events_tx,
            tasks: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        });

        let events_task = {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                while let Some(event) = events_rx.recv().await {
                    inner.handle_event(event);
                }
            })
        };
        let refresh_task = inner.spawn_ticker(inner.settings.lock_refresh_interval, |inner| {
            inner.refresh_lock();
        });
        let snapshot_task = inner.spawn_ticker(inner.settings.snapshot_interval, |inner| {
            if let Err(e) = inner.create_snapshot() {
                warn!(error = %e, "Periodic snapshot failed");
            }
        });
        inner
            .tasks
            .lock()
            .extend([events_task, refresh_task, snapshot_task]);

        info!(tab_id = %inner.services.locks.tab_id(), draft_id = ?draft_id, "Draft session started");
        if let Some(id) = draft_id {
            inner.switch_draft(Some(id));
        }

        Ok(Self { inner })
    }

    pub fn tab_id(&self) -> TabId {
        self.inner.services.locks.tab_id()
    }

    /// The active draft, if one has been loaded or allocated
    pub fn draft_id(&self) -> Option<DraftId> {
        self.inner.state.lock().draft_id
    }

    /// The form as last fed to the session
    pub fn form(&self) -> DraftForm {
        self.inner.state.lock().form.clone()
    }

    /// Current status
    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    /// Watch every status change
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    /// Feed edited form data into the session
    ///
    /// Empty forms and forms arriving while conflicted are kept but not
    /// saved. Otherwise the session moves to `saving` and schedules a
    /// debounced autosave.
    pub fn update_form(&self, form: DraftForm) {
        self.inner.update_form(form);
    }

    /// Point the session at another draft (or none)
    ///
    /// Releases the current lock, clears any conflict and runs session start
    /// for the new draft.
    pub fn set_draft_id(&self, draft_id: Option<DraftId>) {
        self.inner.switch_draft(draft_id);
    }

    /// Save the current form immediately
    ///
    /// Returns `Ok(None)` without writing while conflicted, torn down or with
    /// an empty form.
    ///
    /// # Errors
    /// Propagates the store's write failure; the session stays in `saving`
    pub fn save_draft_now(&self) -> Result<Option<Draft>, ApplicationError> {
        self.inner.save_draft_now()
    }

    /// Snapshot the persisted draft
    ///
    /// Returns `Ok(None)` when there is no active draft, no persisted record,
    /// or the session is conflicted.
    ///
    /// # Errors
    /// Propagates the snapshot store's write failure
    pub fn create_snapshot(&self) -> Result<Option<DraftSnapshot>, ApplicationError> {
        self.inner.create_snapshot()
    }

    /// Snapshots of the active draft, oldest first
    pub fn snapshots(&self) -> Vec<DraftSnapshot> {
        self.draft_id()
            .map(|id| self.inner.services.snapshots.get_draft_snapshots(&id))
            .unwrap_or_default()
    }

    /// Write a snapshot's content back as the active draft
    ///
    /// # Errors
    /// Propagates the store's write failure
    pub fn restore_snapshot(
        &self,
        snapshot_id: SnapshotId,
    ) -> Result<Option<Draft>, ApplicationError> {
        self.inner.restore_snapshot(snapshot_id)
    }

    /// Leave the conflict state and take the lock over
    ///
    /// # Errors
    /// Fails if the takeover lock cannot be written
    pub fn dismiss_conflict(&self) -> Result<(), ApplicationError> {
        self.inner.dismiss_conflict()
    }

    /// Stop timers, release the lock and unsubscribe; safe to call repeatedly
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Drop for DraftSession {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl SessionInner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn publish(&self, state: &SessionState) {
        self.status.send_replace(state.status.clone());
    }

    fn spawn_ticker<F>(self: &Arc<Self>, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(&Self) + Send + 'static,
    {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick(inner.as_ref());
            }
        })
    }

    fn update_form(self: &Arc<Self>, form: DraftForm) {
        let draft_id = {
            let mut state = self.state.lock();
            if self.is_torn_down() {
                return;
            }
            state.form = form.clone();
            if form.is_empty() {
                debug!("Form is empty, autosave skipped");
                return;
            }
            if state.in_conflict() {
                debug!("Session is conflicted, autosave skipped");
                return;
            }
            state.status.save_status = SaveStatus::Saving;
            self.publish(&state);
            state.draft_id
        };

        let inner = Arc::clone(self);
        self.autosave
            .schedule_auto_save(draft_id, form, move |result| match result {
                Ok(draft) => inner.on_saved(&draft),
                Err(e) => inner.on_save_failed(&e),
            });
    }

    fn save_draft_now(self: &Arc<Self>) -> Result<Option<Draft>, ApplicationError> {
        let (draft_id, form) = {
            let mut state = self.state.lock();
            if self.is_torn_down() || state.in_conflict() {
                debug!("Manual save refused");
                return Ok(None);
            }
            if state.form.is_empty() {
                debug!("Form is empty, manual save skipped");
                return Ok(None);
            }
            state.status.save_status = SaveStatus::Saving;
            self.publish(&state);
            (state.draft_id, state.form.clone())
        };

        self.autosave.cancel_auto_save();
        self.persist(draft_id, &form).map(Some)
    }

    fn persist(
        self: &Arc<Self>,
        draft_id: Option<DraftId>,
        form: &DraftForm,
    ) -> Result<Draft, ApplicationError> {
        match self.services.drafts.save_draft(draft_id, form) {
            Ok(draft) => {
                self.on_saved(&draft);
                Ok(draft)
            },
            Err(e) => {
                self.on_save_failed(&e);
                Err(e)
            },
        }
    }

    fn on_saved(self: &Arc<Self>, draft: &Draft) {
        let (adopted, refresh) = {
            let mut state = self.state.lock();
            if self.is_torn_down() {
                return;
            }
            let adopted = state.draft_id.is_none();
            if adopted {
                state.draft_id = Some(draft.id);
            } else if state.draft_id != Some(draft.id) {
                debug!(draft_id = %draft.id, "Save completed for a draft no longer active");
                return;
            }

            state.status.last_saved_at = Some(draft.updated_at);
            state.status.last_error = None;
            let refresh = !state.in_conflict();
            if refresh {
                state.status.save_status = SaveStatus::Saved;
                state.saved_generation += 1;
                let generation = state.saved_generation;
                if let Some(previous) = state.revert.replace(self.spawn_revert(generation)) {
                    previous.abort();
                }
            }
            self.publish(&state);
            (adopted, refresh)
        };

        if adopted {
            info!(draft_id = %draft.id, "Adopted newly allocated draft id");
            if let Some(hook) = &self.callbacks.on_draft_id_change {
                hook(draft.id);
            }
            self.activate_draft(draft.id);
        } else if refresh {
            if let Err(e) = self.services.locks.set_draft_lock(&draft.id) {
                warn!(draft_id = %draft.id, error = %e, "Lock refresh after save failed");
            }
        }
    }

    fn on_save_failed(&self, error: &ApplicationError) {
        warn!(error = %error, "Draft save failed");
        let mut state = self.state.lock();
        if self.is_torn_down() {
            return;
        }
        state.status.last_error = Some(error.to_string());
        self.publish(&state);
    }

    fn spawn_revert(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        let display = self.settings.saved_display;
        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            let mut state = inner.state.lock();
            if state.saved_generation == generation && state.status.save_status == SaveStatus::Saved
            {
                state.status.save_status = SaveStatus::Idle;
                inner.publish(&state);
            }
        })
    }

    /// Release the current draft and run session start for `draft_id`
    fn switch_draft(self: &Arc<Self>, draft_id: Option<DraftId>) {
        let form = draft_id
            .and_then(|id| self.services.drafts.get_draft(&id))
            .map(|draft| DraftForm::from(&draft))
            .unwrap_or_default();

        let (previous, subscription, revert) = {
            let mut state = self.state.lock();
            if self.is_torn_down() || state.draft_id == draft_id {
                return;
            }
            let previous = state.draft_id;
            state.draft_id = draft_id;
            state.form = form;
            state.status = SessionStatus::default();
            self.publish(&state);
            (previous, state.subscription.take(), state.revert.take())
        };

        drop(subscription);
        if let Some(revert) = revert {
            revert.abort();
        }
        self.autosave.cancel_auto_save();
        if let Some(previous) = previous {
            self.release_lock(previous);
        }
        if let Some(id) = draft_id {
            self.activate_draft(id);
        }
    }

    /// Session start for a known draft id
    #[instrument(skip(self), fields(tab_id = %self.services.locks.tab_id()))]
    fn activate_draft(self: &Arc<Self>, draft_id: DraftId) {
        let events = self.events.clone();
        let subscription = self.services.notifier.subscribe(draft_id, move |event| {
            let _ = events.send(event);
        });
        {
            let mut state = self.state.lock();
            if self.is_torn_down() || state.draft_id != Some(draft_id) {
                return;
            }
            state.subscription = Some(subscription);
        }

        let check = self.services.locks.check_draft_conflict(&draft_id);
        if check.has_conflict {
            let remote = self.services.drafts.get_draft(&draft_id);
            self.enter_conflict(DraftConflict::new(check.lock, remote));
        } else {
            match self.services.locks.set_draft_lock(&draft_id) {
                Ok(_) => info!("Acquired draft lock"),
                Err(e) => {
                    warn!(error = %e, "Failed to acquire draft lock");
                    self.record_error(&e);
                },
            }
        }

        let count = self.services.snapshots.count(&draft_id);
        let mut state = self.state.lock();
        if state.draft_id == Some(draft_id) {
            state.status.snapshot_count = count;
            self.publish(&state);
        }
    }

    fn enter_conflict(&self, conflict: DraftConflict) {
        {
            let mut state = self.state.lock();
            if self.is_torn_down() {
                return;
            }
            state.status.conflict = Some(conflict.clone());
            state.status.save_status = SaveStatus::Conflict;
            if let Some(revert) = state.revert.take() {
                revert.abort();
            }
            self.publish(&state);
        }

        self.autosave.cancel_auto_save();
        info!(
            holder = ?conflict.lock.map(|l| l.tab_id),
            "Draft is being edited in another tab"
        );
        if let Some(hook) = &self.callbacks.on_conflict_detected {
            hook(&conflict);
        }
    }

    fn handle_event(&self, event: StorageChangeEvent) {
        let draft_id = event.draft_id();
        {
            let state = self.state.lock();
            if self.is_torn_down() || state.draft_id != Some(draft_id) {
                return;
            }
        }
        debug!(draft_id = %draft_id, kind = event.kind(), "Handling cross-tab event");

        match event {
            StorageChangeEvent::LockAcquired { lock } => {
                if lock.is_owned_by(&self.services.locks.tab_id()) {
                    return;
                }
                let check = self.services.locks.check_draft_conflict(&draft_id);
                if !check.has_conflict {
                    return;
                }
                let already_conflicted = {
                    let mut state = self.state.lock();
                    match state.status.conflict.as_mut() {
                        Some(conflict) => {
                            conflict.lock = check.lock;
                            self.publish(&state);
                            true
                        },
                        None => false,
                    }
                };
                if !already_conflicted {
                    let remote = self.services.drafts.get_draft(&draft_id);
                    self.enter_conflict(DraftConflict::new(check.lock, remote));
                }
            },
            StorageChangeEvent::DraftUpdated { draft } => {
                {
                    let mut state = self.state.lock();
                    if let Some(conflict) = state.status.conflict.as_mut() {
                        conflict.remote_draft = Some((*draft).clone());
                        self.publish(&state);
                    }
                }
                if let Some(hook) = &self.callbacks.on_remote_update {
                    hook(draft.as_ref());
                }
            },
            StorageChangeEvent::SnapshotsChanged { count, .. } => {
                let mut state = self.state.lock();
                state.status.snapshot_count = count;
                self.publish(&state);
            },
            StorageChangeEvent::LockReleased { .. } => {
                debug!(draft_id = %draft_id, "Lock released by another tab");
            },
            StorageChangeEvent::DraftRemoved { .. } => {
                info!(draft_id = %draft_id, "Active draft was removed in another tab");
            },
        }
    }

    fn refresh_lock(&self) {
        let draft_id = {
            let state = self.state.lock();
            if self.is_torn_down() || state.in_conflict() {
                return;
            }
            state.draft_id
        };
        if let Some(id) = draft_id {
            if let Err(e) = self.services.locks.set_draft_lock(&id) {
                warn!(draft_id = %id, error = %e, "Lock refresh failed");
            }
        }
    }

    fn create_snapshot(&self) -> Result<Option<DraftSnapshot>, ApplicationError> {
        let draft_id = {
            let state = self.state.lock();
            if self.is_torn_down() || state.in_conflict() {
                return Ok(None);
            }
            state.draft_id
        };
        let Some(draft_id) = draft_id else {
            debug!("No active draft, snapshot skipped");
            return Ok(None);
        };
        let Some(draft) = self.services.drafts.get_draft(&draft_id) else {
            debug!(draft_id = %draft_id, "Draft not persisted yet, snapshot skipped");
            return Ok(None);
        };

        let snapshot = self.services.snapshots.save_draft_snapshot(&draft)?;
        let count = self.services.snapshots.count(&draft_id);
        let mut state = self.state.lock();
        if state.draft_id == Some(draft_id) {
            state.status.snapshot_count = count;
            self.publish(&state);
        }
        Ok(Some(snapshot))
    }

    fn restore_snapshot(
        self: &Arc<Self>,
        snapshot_id: SnapshotId,
    ) -> Result<Option<Draft>, ApplicationError> {
        let draft_id = {
            let state = self.state.lock();
            if self.is_torn_down() || state.in_conflict() {
                return Ok(None);
            }
            state.draft_id
        };
        let Some(draft_id) = draft_id else {
            return Ok(None);
        };
        let Some(snapshot) = self.services.snapshots.get_snapshot(&draft_id, &snapshot_id) else {
            debug!(draft_id = %draft_id, snapshot_id = %snapshot_id, "Snapshot not found");
            return Ok(None);
        };

        let form = DraftForm::from(&snapshot.draft);
        self.autosave.cancel_auto_save();
        {
            let mut state = self.state.lock();
            state.form = form.clone();
            state.status.save_status = SaveStatus::Saving;
            self.publish(&state);
        }
        info!(draft_id = %draft_id, snapshot_id = %snapshot_id, "Restoring snapshot");
        self.persist(Some(draft_id), &form).map(Some)
    }

    fn dismiss_conflict(&self) -> Result<(), ApplicationError> {
        let draft_id = {
            let mut state = self.state.lock();
            if self.is_torn_down() || !state.in_conflict() {
                return Ok(());
            }
            state.status.conflict = None;
            state.status.save_status = SaveStatus::Idle;
            self.publish(&state);
            state.draft_id
        };

        if let Some(id) = draft_id {
            if let Err(e) = self.services.locks.set_draft_lock(&id) {
                self.record_error(&e);
                return Err(e);
            }
            info!(draft_id = %id, "Took over draft lock");
        }
        Ok(())
    }

    fn record_error(&self, error: &ApplicationError) {
        let mut state = self.state.lock();
        state.status.last_error = Some(error.to_string());
        self.publish(&state);
    }

    fn release_lock(&self, draft_id: DraftId) {
        if let Err(e) = self.services.locks.release_draft_lock(&draft_id) {
            warn!(draft_id = %draft_id, error = %e, "Failed to release draft lock");
        }
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.autosave.cancel_auto_save();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        let (draft_id, subscription, revert) = {
            let mut state = self.state.lock();
            (state.draft_id, state.subscription.take(), state.revert.take())
        };
        drop(subscription);
        if let Some(revert) = revert {
            revert.abort();
        }
        if let Some(id) = draft_id {
            self.release_lock(id);
        }
        debug!(draft_id = ?draft_id, "Draft session torn down");
    }
}
