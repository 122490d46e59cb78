//! Timing and retention settings shared by the draft services

use std::time::Duration;

use crate::error::ApplicationError;

/// Quiet period before a burst of form changes is written
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// How long `saved` is shown before the status reverts to `idle`
pub const DEFAULT_SAVED_DISPLAY: Duration = Duration::from_secs(2);

/// How often a session re-writes its lock while editing
pub const DEFAULT_LOCK_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Age after which a lock no longer blocks other tabs (3x the refresh interval)
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(90);

/// How often a session snapshots the persisted draft
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Snapshots retained per draft
pub const DEFAULT_MAX_SNAPSHOTS: usize = 20;

/// Settings for the draft store, lock manager, snapshot store and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSyncSettings {
    pub autosave_debounce: Duration,
    pub saved_display: Duration,
    pub lock_refresh_interval: Duration,
    pub lock_ttl: Duration,
    pub snapshot_interval: Duration,
    pub max_snapshots: usize,
}

impl Default for DraftSyncSettings {
    fn default() -> Self {
        Self {
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            saved_display: DEFAULT_SAVED_DISPLAY,
            lock_refresh_interval: DEFAULT_LOCK_REFRESH_INTERVAL,
            lock_ttl: DEFAULT_LOCK_TTL,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

impl DraftSyncSettings {
    /// Reject settings under which the lock protocol cannot work
    ///
    /// A refresh interval at or above the TTL would let a live session's
    /// own lock lapse between refreshes and manufacture false conflicts.
    ///
    /// # Errors
    /// Returns `ApplicationError::Configuration` describing the first problem
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let intervals = [
            ("autosave_debounce", self.autosave_debounce),
            ("lock_refresh_interval", self.lock_refresh_interval),
            ("lock_ttl", self.lock_ttl),
            ("snapshot_interval", self.snapshot_interval),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(ApplicationError::Configuration(format!(
                "{name} must be greater than zero"
            )));
        }
        if self.lock_refresh_interval >= self.lock_ttl {
            return Err(ApplicationError::Configuration(format!(
                "lock_refresh_interval ({:?}) must be shorter than lock_ttl ({:?})",
                self.lock_refresh_interval, self.lock_ttl
            )));
        }
        if self.max_snapshots == 0 {
            return Err(ApplicationError::Configuration(
                "max_snapshots must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Lock TTL as a chrono duration for timestamp arithmetic
    pub fn lock_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lock_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(36_500))
    }
}
