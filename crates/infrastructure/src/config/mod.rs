//! Application configuration
//!
//! Split into focused sub-modules:
//! - `storage`: substrate backend and SQLite settings
//! - `timing`: autosave, lock and snapshot timers
//! - `logging`: log filter and format
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `draftsync.toml`, then `DRAFTSYNC_*` environment variables with `__`
//! between nested keys (e.g. `DRAFTSYNC_TIMING__LOCK_TTL_MS=120000`).

mod logging;
mod storage;
mod timing;

use application::{ApplicationError, DraftSyncSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use logging::LoggingConfig;
pub use storage::{StorageBackend, StorageConfig};
pub use timing::TimingConfig;

/// Config file looked up when no path is given (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "draftsync";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "DRAFTSYNC";

/// Complete draftsync configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `draftsync.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given file (if present) and the environment
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        Self::build(file, env_source())
    }

    fn build(file: &str, env: config::Environment) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("storage.backend", "sqlite")?
            .set_default("logging.filter", "info")?
            .add_source(config::File::with_name(file).required(false))
            .add_source(env);

        let config: Self = builder.build()?.try_deserialize()?;
        debug!(file, backend = ?config.storage.backend, "Configuration loaded");
        Ok(config)
    }

    /// Validated timing settings for the draft services
    ///
    /// # Errors
    /// Returns `ApplicationError::Configuration` for unusable timings
    pub fn draft_settings(&self) -> Result<DraftSyncSettings, ApplicationError> {
        self.timing.to_settings()
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
