// packages/listener/src/interception/registry.rs
//! Ordered subscriber registry
//!
//! Callbacks are kept in subscription order. Dispatch works on a snapshot,
//! so a callback that subscribes or unsubscribes mid-dispatch neither
//! skips nor duplicates anyone for the current call.

use crate::interception::state::ListeningStateMachine;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

struct Entry<T: ?Sized> {
    id: u64,
    callback: Arc<T>,
}

struct Entries<T: ?Sized> {
    entries: Mutex<Vec<Entry<T>>>,
    next_id: AtomicU64,
}

/// Removal by registration id, erased over the callback type
trait Revoke: Send + Sync {
    fn revoke(&self, id: u64) -> bool;
}

impl<T: ?Sized + Send + Sync> Revoke for Entries<T> {
    fn revoke(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                // `remove` keeps the relative order of the rest
                entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Ordered set of callbacks of shape `T`
pub struct SubscriberRegistry<T: ?Sized> {
    name: &'static str,
    inner: Arc<Entries<T>>,
    state: Arc<ListeningStateMachine>,
}

impl<T: ?Sized + Send + Sync + 'static> SubscriberRegistry<T> {
    /// Create an empty registry guarded by `state`'s blockers
    pub fn new(name: &'static str, state: Arc<ListeningStateMachine>) -> Self {
        Self {
            name,
            inner: Arc::new(Entries {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
            state,
        }
    }

    /// Append a callback; the returned handle removes this registration only
    pub fn subscribe(&self, callback: Arc<T>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push(Entry { id, callback });
        debug!(registry = self.name, id, "Subscriber added");

        let inner: Arc<dyn Revoke> = self.inner.clone();
        Subscription {
            registry: Arc::downgrade(&inner),
            id,
            revoked: AtomicBool::new(false),
        }
    }

    /// Empty the registry unless the listening state is blocked
    pub fn clear(&self) -> bool {
        if self.state.is_blocked() {
            return false;
        }
        self.inner.entries.lock().clear();
        debug!(registry = self.name, "Subscribers cleared");
        true
    }

    /// Callbacks in subscription order, as of now
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.inner
            .entries
            .lock()
            .iter()
            .map(|e| Arc::clone(&e.callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability to remove exactly one registration
///
/// Dropping the handle leaves the callback subscribed.
#[must_use = "dropping a Subscription makes the callback impossible to unsubscribe"]
pub struct Subscription {
    registry: Weak<dyn Revoke>,
    id: u64,
    revoked: AtomicBool,
}

impl Subscription {
    /// Remove the registration; repeat calls are no-ops
    pub fn unsubscribe(&self) {
        if self.revoked.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            if registry.revoke(self.id) {
                debug!(id = self.id, "Subscriber removed");
            }
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("revoked", &self.is_unsubscribed())
            .finish()
    }
}
