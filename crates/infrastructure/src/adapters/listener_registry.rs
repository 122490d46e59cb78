//! Cross-context change listeners
//!
//! Every substrate adapter shares one registry between its contexts. A write
//! made through context `n` is dispatched to listeners registered by every
//! context except `n`.

use std::sync::{Arc, Weak};

use application::ports::{ChangeListener, KeyChange, Subscription};
use parking_lot::Mutex;
use tracing::trace;

/// Identity of one execution context (tab) of a substrate
pub type ContextId = u64;

struct Registered {
    id: u64,
    context: ContextId,
    listener: ChangeListener,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    next_context: ContextId,
    listeners: Vec<Registered>,
}

/// Listener table shared by all contexts of one substrate
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh context identity
    pub fn next_context(&self) -> ContextId {
        let mut inner = self.inner.lock();
        inner.next_context += 1;
        inner.next_context
    }

    /// Register `listener` on behalf of `context`
    ///
    /// The listener stays registered until the returned guard is dropped.
    pub fn register(&self, context: ContextId, listener: ChangeListener) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push(Registered {
                id,
                context,
                listener,
            });
            id
        };

        let registry: Weak<Mutex<RegistryInner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().listeners.retain(|r| r.id != id);
            }
        })
    }

    /// Deliver `change` to every listener not registered by `origin`
    ///
    /// Listeners run after the registry lock is released, so they may
    /// subscribe or unsubscribe.
    pub fn dispatch(&self, origin: ContextId, change: &KeyChange) {
        let targets: Vec<ChangeListener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .filter(|r| r.context != origin)
            .map(|r| Arc::clone(&r.listener))
            .collect();

        trace!(key = %change.key, origin, targets = targets.len(), "Dispatching change");
        for listener in targets {
            listener(change);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, ChangeListener) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        let listener: ChangeListener = Arc::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (hits, listener)
    }

    fn change() -> KeyChange {
        KeyChange {
            key: "k".to_string(),
            new_value: Some("v".to_string()),
            old_value: None,
        }
    }

    #[test]
    fn origin_context_is_skipped() {
        let registry = ListenerRegistry::new();
        let (a, b) = (registry.next_context(), registry.next_context());
        let (hits_a, listener_a) = counter();
        let (hits_b, listener_b) = counter();
        let _sa = registry.register(a, listener_a);
        let _sb = registry.register(b, listener_b);

        registry.dispatch(a, &change());

        assert_eq!(hits_a.load(Ordering::SeqCst), 0);
        assert_eq!(hits_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_guard_unregisters() {
        let registry = ListenerRegistry::new();
        let (hits, listener) = counter();
        let sub = registry.register(1, listener);
        assert_eq!(registry.len(), 1);

        drop(sub);
        registry.dispatch(2, &change());

        assert!(registry.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn guard_outliving_registry_is_harmless() {
        let registry = ListenerRegistry::new();
        let (_, listener) = counter();
        let sub = registry.register(1, listener);
        drop(registry);
        drop(sub);
    }

    #[test]
    fn listener_may_unsubscribe_during_dispatch() {
        let registry = ListenerRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner_slot = Arc::clone(&slot);
        let listener: ChangeListener = Arc::new(move |_| {
            inner_slot.lock().take();
        });
        *slot.lock() = Some(registry.register(1, listener));

        registry.dispatch(2, &change());
        assert!(registry.is_empty());
    }

    #[test]
    fn contexts_are_unique() {
        let registry = ListenerRegistry::new();
        let first = registry.next_context();
        assert_ne!(first, registry.next_context());
    }
}
