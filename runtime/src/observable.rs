//! Minimal observable value with per-subscriber deduplication.
//!
//! An [`Observable`] holds a current value and a list of sinks. Publishing
//! stores the new value and offers it to every sink; each sink projects the
//! value to a key, drops it if its duplicate predicate matches the last key it
//! delivered, and otherwise hands the key to its callback. Subscribing
//! delivers the current value immediately.
//!
//! Delivery is synchronous on the publishing thread and keeps only the latest
//! value: there is no buffering and no backpressure. Each sink serializes its
//! own deliveries, so the value replayed on subscribe is always seen before
//! anything published afterwards.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Lock a mutex, recovering the data if a sink panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Type-erased subscriber
trait Deliver<T>: Send + Sync {
    fn deliver(&self, value: &T);
}

/// Projection, duplicate filter and callback of one subscriber
struct Filter<K, M, D, S> {
    map: M,
    is_duplicate: D,
    sink: S,
    last: Mutex<Option<K>>,
}

impl<K, M, D, S> Filter<K, M, D, S> {
    fn offer<T>(&self, last: &mut Option<K>, value: &T)
    where
        M: Fn(&T) -> K,
        D: Fn(&K, &K) -> bool,
        S: Fn(&K),
    {
        let key = (self.map)(value);
        if let Some(previous) = last.as_ref() {
            if (self.is_duplicate)(previous, &key) {
                return;
            }
        }
        (self.sink)(&key);
        *last = Some(key);
    }
}

impl<T, K, M, D, S> Deliver<T> for Filter<K, M, D, S>
where
    K: Send,
    M: Fn(&T) -> K + Send + Sync,
    D: Fn(&K, &K) -> bool + Send + Sync,
    S: Fn(&K) + Send + Sync,
{
    fn deliver(&self, value: &T) {
        let mut last = lock(&self.last);
        self.offer(&mut last, value);
    }
}

struct Registry<T> {
    current: T,
    next_id: u64,
    sinks: Vec<(u64, Arc<dyn Deliver<T>>)>,
}

/// A current-value cell that notifies subscribers on publish
///
/// Cloning yields another handle to the same cell.
pub struct Observable<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("Observable")
            .field("current", &registry.current)
            .field("subscribers", &registry.sinks.len())
            .finish()
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + 'static,
{
    /// Create an observable holding `initial`
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                current: initial,
                next_id: 0,
                sinks: Vec::new(),
            })),
        }
    }

    /// Clone of the current value
    #[must_use]
    pub fn get(&self) -> T {
        lock(&self.registry).current.clone()
    }

    /// Read the current value through a closure
    ///
    /// The registry stays locked while `f` runs, so `f` must not subscribe or
    /// publish on the same observable.
    pub fn with<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&T) -> U,
    {
        f(&lock(&self.registry).current)
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).sinks.len()
    }

    /// Store `value` as current and offer it to every subscriber
    ///
    /// Subscribers run on the calling thread before this returns. Publishing
    /// from inside a subscriber callback of the same observable deadlocks.
    pub fn publish(&self, value: T) {
        let sinks: Vec<Arc<dyn Deliver<T>>> = {
            let mut registry = lock(&self.registry);
            registry.current = value.clone();
            registry.sinks.iter().map(|(_, sink)| Arc::clone(sink)).collect()
        };

        for sink in sinks {
            sink.deliver(&value);
        }
    }

    /// Subscribe with an explicit projection and duplicate predicate
    ///
    /// `map` turns each published value into a key, `is_duplicate` compares
    /// it with the last delivered key, and `sink` receives keys that pass.
    /// The current value is offered immediately.
    pub fn subscribe_filtered<K, M, D, S>(&self, map: M, is_duplicate: D, sink: S) -> Subscription
    where
        K: Send + 'static,
        M: Fn(&T) -> K + Send + Sync + 'static,
        D: Fn(&K, &K) -> bool + Send + Sync + 'static,
        S: Fn(&K) + Send + Sync + 'static,
    {
        let filter = Arc::new(Filter {
            map,
            is_duplicate,
            sink,
            last: Mutex::new(None),
        });

        // Hold the sink's lock across registration so a concurrent publish
        // cannot overtake the replayed value.
        let mut last = lock(&filter.last);
        let (id, current) = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            let sink: Arc<dyn Deliver<T>> = Arc::clone(&filter) as Arc<dyn Deliver<T>>;
            registry.sinks.push((id, sink));
            (id, registry.current.clone())
        };
        filter.offer(&mut last, &current);
        drop(last);

        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                lock(&registry).sinks.retain(|(sink_id, _)| *sink_id != id);
            }
        })
    }

    /// Subscribe to the whole value, skipping consecutive equal values
    pub fn subscribe<S>(&self, sink: S) -> Subscription
    where
        T: PartialEq,
        S: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_filtered(T::clone, T::eq, sink)
    }

    /// Subscribe to a projection, skipping consecutive equal projections
    pub fn subscribe_map<V, P, S>(&self, project: P, sink: S) -> Subscription
    where
        V: PartialEq + Send + 'static,
        P: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&V) + Send + Sync + 'static,
    {
        self.subscribe_filtered(project, V::eq, sink)
    }
}

/// Guard for a live subscription
///
/// Dropping the guard unsubscribes. Call [`Subscription::detach`] to keep the
/// subscriber for as long as the observable lives.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now
    pub fn cancel(self) {
        drop(self);
    }

    /// Keep the subscriber alive without holding the guard
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
