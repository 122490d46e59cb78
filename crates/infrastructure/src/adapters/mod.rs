//! Infrastructure adapters
//!
//! Implementations of the key-value substrate port.

mod listener_registry;
mod memory_storage;
mod sqlite_storage;

use std::sync::Arc;

use application::ports::KeyValueStorePort;

pub use listener_registry::{ContextId, ListenerRegistry};
pub use memory_storage::{MemoryStorage, MemoryStorageContext};
pub use sqlite_storage::{SqliteStorage, SqliteStorageContext};

use crate::{
    config::{StorageBackend, StorageConfig},
    persistence::DatabaseError,
};

/// A substrate chosen by configuration
#[derive(Debug, Clone)]
pub enum Storage {
    Memory(MemoryStorage),
    Sqlite(SqliteStorage),
}

impl Storage {
    /// Open the backend named in `config`
    pub fn open(config: &StorageConfig) -> Result<Self, DatabaseError> {
        Ok(match config.backend {
            StorageBackend::Memory => Self::Memory(match config.quota_bytes {
                Some(quota) => MemoryStorage::with_quota(quota),
                None => MemoryStorage::new(),
            }),
            StorageBackend::Sqlite => Self::Sqlite(SqliteStorage::open(config)?),
        })
    }

    /// Open a new execution context as a port object
    pub fn context(&self) -> Arc<dyn KeyValueStorePort> {
        match self {
            Self::Memory(storage) => Arc::new(storage.context()),
            Self::Sqlite(storage) => Arc::new(storage.context()),
        }
    }
}
