//! In-memory substrate fake for service tests
//!
//! Behaves like one execution context of a shared store: its own writes
//! notify nobody, while `foreign_set`/`foreign_remove` play the part of
//! another tab and notify every registered listener.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    error::ApplicationError,
    ports::{ChangeListener, KeyChange, KeyValueStorePort, Subscription},
};

type Listeners = Arc<Mutex<Vec<(u64, ChangeListener)>>>;

/// Single-context fake of the shared key-value substrate
#[derive(Default)]
pub struct FakeStore {
    entries: Mutex<BTreeMap<String, String>>,
    listeners: Listeners,
    writes: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    next_listener: AtomicU64,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent `set`/`remove` fail with a storage error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of local `set` calls whose key starts with `prefix`
    pub fn write_count(&self, prefix: &str) -> usize {
        self.writes
            .lock()
            .iter()
            .filter(|k| k.starts_with(prefix))
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Put a value without recording a write or notifying anyone
    pub fn seed(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    /// Simulate another tab writing `key`
    pub fn foreign_set(&self, key: &str, value: &str) {
        let old_value = self.entries.lock().insert(key.to_string(), value.to_string());
        self.notify(&KeyChange {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            old_value,
        });
    }

    /// Simulate another tab removing `key`
    pub fn foreign_remove(&self, key: &str) {
        let old_value = self.entries.lock().remove(key);
        self.notify(&KeyChange {
            key: key.to_string(),
            new_value: None,
            old_value,
        });
    }

    fn notify(&self, change: &KeyChange) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    fn check_writable(&self) -> Result<(), ApplicationError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ApplicationError::Storage("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStorePort for FakeStore {
    fn get(&self, key: &str) -> Result<Option<String>, ApplicationError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApplicationError> {
        self.check_writable()?;
        self.writes.lock().push(key.to_string());
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApplicationError> {
        self.check_writable()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, ApplicationError> {
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, listener));
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || listeners.lock().retain(|(l, _)| *l != id))
    }
}
