//! Substrate backend configuration.

use serde::{Deserialize, Serialize};

/// Which substrate implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// SQLite file, survives restarts
    #[default]
    Sqlite,
}

/// Substrate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file (`:memory:` for a private database)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Maximum number of pooled SQLite connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Byte budget of the memory backend; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,
}

fn default_db_path() -> String {
    "draftsync.db".to_string()
}

const fn default_max_connections() -> u32 {
    4
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_db_path(),
            max_connections: default_max_connections(),
            quota_bytes: None,
        }
    }
}
