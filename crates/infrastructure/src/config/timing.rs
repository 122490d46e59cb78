//! Session timing configuration.

use std::time::Duration;

use application::{ApplicationError, DraftSyncSettings};
use serde::{Deserialize, Serialize};

/// Timers and retention, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// How long `saved` is displayed before reverting to `idle`
    #[serde(default = "default_saved_display_ms")]
    pub saved_display_ms: u64,

    #[serde(default = "default_lock_refresh_interval_ms")]
    pub lock_refresh_interval_ms: u64,

    /// Must exceed `lock_refresh_interval_ms`
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,

    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

const fn default_autosave_debounce_ms() -> u64 {
    2_000
}

const fn default_saved_display_ms() -> u64 {
    2_000
}

const fn default_lock_refresh_interval_ms() -> u64 {
    30_000
}

const fn default_lock_ttl_ms() -> u64 {
    90_000
}

const fn default_snapshot_interval_ms() -> u64 {
    30_000
}

const fn default_max_snapshots() -> usize {
    20
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: default_autosave_debounce_ms(),
            saved_display_ms: default_saved_display_ms(),
            lock_refresh_interval_ms: default_lock_refresh_interval_ms(),
            lock_ttl_ms: default_lock_ttl_ms(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            max_snapshots: default_max_snapshots(),
        }
    }
}

impl TimingConfig {
    /// Convert to validated service settings
    ///
    /// # Errors
    /// Returns `ApplicationError::Configuration` when the values cannot drive
    /// the lock protocol
    pub fn to_settings(&self) -> Result<DraftSyncSettings, ApplicationError> {
        let settings = DraftSyncSettings {
            autosave_debounce: Duration::from_millis(self.autosave_debounce_ms),
            saved_display: Duration::from_millis(self.saved_display_ms),
            lock_refresh_interval: Duration::from_millis(self.lock_refresh_interval_ms),
            lock_ttl: Duration::from_millis(self.lock_ttl_ms),
            snapshot_interval: Duration::from_millis(self.snapshot_interval_ms),
            max_snapshots: self.max_snapshots,
        };
        settings.validate()?;
        Ok(settings)
    }
}
