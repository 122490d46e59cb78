//! Durable substrate on SQLite
//!
//! Same contract as the in-memory store, persisted in the `kv_entries` table.
//! Change notifications reach the other contexts of this process; a second
//! process sharing the file sees the data but not the notifications.

use std::sync::Arc;

use application::{
    error::ApplicationError,
    ports::{ChangeListener, KeyChange, KeyValueStorePort, Subscription},
};
use chrono::Utc;
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::{debug, instrument};

use super::listener_registry::{ContextId, ListenerRegistry};
use crate::{
    config::StorageConfig,
    persistence::{ConnectionPool, DatabaseError, PooledConn, create_pool, map_database_error},
};

/// SQLite-backed key-value store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: Arc<ConnectionPool>,
    registry: ListenerRegistry,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Wrap an already migrated pool
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool: Arc::new(pool),
            registry: ListenerRegistry::new(),
        }
    }

    /// Create the pool described by `config` and migrate it
    pub fn open(config: &StorageConfig) -> Result<Self, DatabaseError> {
        Ok(Self::new(create_pool(config)?))
    }

    /// Open a new execution context on this store
    pub fn context(&self) -> SqliteStorageContext {
        SqliteStorageContext {
            storage: self.clone(),
            id: self.registry.next_context(),
        }
    }

    fn conn(&self) -> Result<PooledConn, ApplicationError> {
        self.pool.get().map_err(map_database_error)
    }
}

/// One tab's view of a [`SqliteStorage`]
pub struct SqliteStorageContext {
    storage: SqliteStorage,
    id: ContextId,
}

impl std::fmt::Debug for SqliteStorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorageContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

fn read_value(tx: &Transaction<'_>, key: &str) -> Result<Option<String>, rusqlite::Error> {
    tx.query_row(
        "SELECT value FROM kv_entries WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

impl SqliteStorageContext {
    pub const fn id(&self) -> ContextId {
        self.id
    }

    fn write(&self, key: &str, value: &str) -> Result<Option<Option<String>>, DatabaseError> {
        let mut conn = self.storage.pool.get()?;
        let tx = conn.transaction()?;

        let old_value = read_value(&tx, key)?;
        if old_value.as_deref() == Some(value) {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(Some(old_value))
    }

    fn delete(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut conn = self.storage.pool.get()?;
        let tx = conn.transaction()?;

        let old_value = read_value(&tx, key)?;
        if old_value.is_some() {
            tx.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            tx.commit()?;
        }
        Ok(old_value)
    }
}

impl KeyValueStorePort for SqliteStorageContext {
    fn get(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        let conn = self.storage.conn()?;
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_database_error)
    }

    #[instrument(skip(self, value), fields(context = self.id))]
    fn set(&self, key: &str, value: &str) -> Result<(), ApplicationError> {
        let Some(old_value) = self.write(key, value).map_err(map_database_error)? else {
            return Ok(());
        };

        debug!("Stored entry");
        self.storage.registry.dispatch(
            self.id,
            &KeyChange {
                key: key.to_string(),
                new_value: Some(value.to_string()),
                old_value,
            },
        );
        Ok(())
    }

    #[instrument(skip(self), fields(context = self.id))]
    fn remove(&self, key: &str) -> Result<(), ApplicationError> {
        let Some(old_value) = self.delete(key).map_err(map_database_error)? else {
            return Ok(());
        };

        debug!("Removed entry");
        self.storage.registry.dispatch(
            self.id,
            &KeyChange {
                key: key.to_string(),
                new_value: None,
                old_value: Some(old_value),
            },
        );
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, ApplicationError> {
        let conn = self.storage.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT key FROM kv_entries
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )
            .map_err(map_database_error)?;

        let keys = stmt
            .query_map(params![prefix], |row| row.get(0))
            .map_err(map_database_error)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(map_database_error)?;
        Ok(keys)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.storage.registry.register(self.id, listener)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::persistence::IN_MEMORY_PATH;

    fn storage() -> SqliteStorage {
        SqliteStorage::open(&StorageConfig {
            path: IN_MEMORY_PATH.to_string(),
            ..StorageConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn set_get_remove() {
        let storage = storage();
        let ctx = storage.context();

        assert!(ctx.get("k").unwrap().is_none());
        ctx.set("k", "v").unwrap();
        assert_eq!(ctx.get("k").unwrap().as_deref(), Some("v"));
        ctx.set("k", "w").unwrap();
        assert_eq!(ctx.get("k").unwrap().as_deref(), Some("w"));
        ctx.remove("k").unwrap();
        assert!(ctx.get("k").unwrap().is_none());
        ctx.remove("k").unwrap();
    }

    #[test]
    fn keys_match_literal_prefix() {
        let storage = storage();
        let ctx = storage.context();
        for key in ["draft:2", "draft:1", "draft-lock:1", "draft%x"] {
            ctx.set(key, "x").unwrap();
        }

        assert_eq!(ctx.keys("draft:").unwrap(), ["draft:1", "draft:2"]);
    }

    #[test]
    fn notifications_carry_old_and_new_values() {
        let storage = storage();
        let (a, b) = (storage.context(), storage.context());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = b.subscribe(Arc::new(move |c: &KeyChange| sink.lock().push(c.clone())));
        let own = Arc::new(Mutex::new(0));
        let own_sink = Arc::clone(&own);
        let _own_sub = a.subscribe(Arc::new(move |_: &KeyChange| *own_sink.lock() += 1));

        a.set("k", "1").unwrap();
        a.set("k", "1").unwrap();
        a.set("k", "2").unwrap();
        a.remove("k").unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].old_value.as_deref(), Some("1"));
        assert_eq!(seen[1].new_value.as_deref(), Some("2"));
        assert!(seen[2].is_removal());
        assert_eq!(*own.lock(), 0);
    }
}
