//! Shared key-value substrate port
//!
//! The substrate is an origin-scoped, synchronous string store shared by
//! every editing tab. Each port instance is one execution context: writes it
//! makes are announced to listeners registered through *other* contexts,
//! never back to itself. Drafts, locks and snapshot lists all live here.

use std::{fmt, sync::Arc};

#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// A single substrate mutation as seen by another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: String,
    /// Value after the write; `None` when the key was removed
    pub new_value: Option<String>,
    /// Value before the write; `None` when the key did not exist
    pub old_value: Option<String>,
}

impl KeyChange {
    pub fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }
}

/// Callback invoked for each foreign write
pub type ChangeListener = Arc<dyn Fn(&KeyChange) + Send + Sync>;

/// Handle to a registered listener
///
/// Dropping the handle unsubscribes. `unsubscribe` does the same explicitly.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the function that removes the listener
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Port for the shared key-value substrate
///
/// All calls are synchronous; implementations must be safe to share across
/// threads. Keys are plain strings namespaced by the caller.
#[cfg_attr(test, automock)]
pub trait KeyValueStorePort: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, ApplicationError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), ApplicationError>;

    /// Delete a key; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), ApplicationError>;

    /// All keys starting with `prefix`, in lexical order
    fn keys(&self, prefix: &str) -> Result<Vec<String>, ApplicationError>;

    /// Register a listener for writes made by other contexts
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}
