use influence_types::{FetchError, Key, ProfileRecord, Query};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives profile updates.
///
/// Updates arrive from worker tasks in completion order, which is not request
/// order. An observer waiting for a particular profile must check
/// `record.key()`.
pub trait ProfileObserver: Send + Sync {
    /// Called with the full current record after every successful merge and
    /// on every cache hit.
    fn on_update(&self, record: &ProfileRecord);

    /// Called when a fetch task gives up. The cache is untouched in that case.
    fn on_error(&self, _key: &Key, _query: Query, _error: &FetchError) {}
}

impl<F> ProfileObserver for F
where
    F: Fn(&ProfileRecord) + Send + Sync,
{
    fn on_update(&self, record: &ProfileRecord) {
        self(record)
    }
}

/// Handle returned by `Publisher::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ObserverList = Vec<(SubscriptionId, Arc<dyn ProfileObserver>)>;

/// Copy-on-write registry of observers.
///
/// Publishing takes a snapshot of the list and calls every observer in
/// registration order without holding the lock, so observers may subscribe
/// or unsubscribe from inside a callback.
#[derive(Default)]
pub struct Publisher {
    observers: RwLock<Arc<ObserverList>>,
    next_id: AtomicU64,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn ProfileObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut observers = self.observers.write();
        let mut next: ObserverList = observers.as_ref().clone();
        next.push((id, observer));
        *observers = Arc::new(next);
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        if !observers.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let next: ObserverList = observers
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *observers = Arc::new(next);
        true
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    pub fn publish(&self, record: &ProfileRecord) {
        for (_, observer) in self.snapshot().iter() {
            observer.on_update(record);
        }
    }

    pub fn publish_error(&self, key: &Key, query: Query, error: &FetchError) {
        for (_, observer) in self.snapshot().iter() {
            observer.on_error(key, query, error);
        }
    }

    fn snapshot(&self) -> Arc<ObserverList> {
        self.observers.read().clone()
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("observers", &self.len())
            .finish()
    }
}
