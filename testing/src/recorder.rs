//! Subscriber sink that records every delivery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Collects the values a subscription delivers
///
/// Clones share the same buffer, so a recorder can hand out a sink and still
/// be inspected afterwards.
///
/// # Example
///
/// ```ignore
/// let counts = Recorder::new();
/// let _subscription = store.subscribe_to(|s| s.count, counts.sink());
///
/// store.send(CounterAction::Increment).await?;
/// assert_eq!(counts.values(), vec![0, 1]);
/// ```
#[derive(Debug)]
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber callback that appends each delivered value
    pub fn sink(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let recorder = self.clone();
        move |value: &T| recorder.lock().push(value.clone())
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.lock().clone()
    }

    /// Number of recorded values
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
