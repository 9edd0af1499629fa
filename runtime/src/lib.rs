//! # Async Action Runtime
//!
//! Runtime implementation for the Async Action architecture.
//!
//! This crate provides the [`Store`] that owns state, runs reducers on a
//! single mutation context, spawns async handlers, and notifies subscribers.
//!
//! ## Core Components
//!
//! - **Store**: Handle to a reducer, its state and its subscriptions
//! - **Mutation executor**: One task per store, the only place `reduce` runs
//! - **Async tasks**: One task per `Effect::Run`, feeding results back as actions
//! - **Observable**: Current-value cell with deduplicating subscribers
//!
//! ## Example
//!
//! ```ignore
//! use async_action_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer);
//!
//! let _subscription = store.subscribe_to(|s| s.count, |count| println!("{count}"));
//!
//! // Resolves once the action and every chained `Effect::Send` have been reduced
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Prometheus metrics for observability
pub mod metrics;

/// Observable value and subscription guard
pub mod observable;

/// The Store and its mutation executor
pub mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Reducers have no error channel; these describe the runtime itself.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The mutation executor is no longer running
        ///
        /// Happens when the Tokio runtime shut down or the executor panicked
        /// inside a reducer. Queued actions are dropped. Returned by awaiting a
        /// `Dispatch` and by `Store::settle`.
        #[error("Store mutation executor has stopped")]
        Stopped,

        /// Timed out waiting for the store to settle
        ///
        /// Returned by `Store::settle` while actions are still queued or async
        /// tasks are still running.
        #[error("Store did not settle: {pending} actions or tasks still in flight")]
        Timeout {
            /// Queued actions plus running async tasks at the deadline
            pending: usize,
        },
    }
}

pub use error::StoreError;

/// How a store reports `send` calls made outside its mutation context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextCheck {
    /// Log a warning for the first off-context send of each store, trace the rest
    #[default]
    Warn,
    /// Only trace off-context sends
    Ignore,
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use async_action_runtime::{ContextCheck, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_name("settings")
///     .with_context_check(ContextCheck::Ignore);
///
/// assert_eq!(config.name, "settings");
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name attached to the store's tracing spans
    pub name: String,
    /// Diagnostic policy for off-context sends
    pub context_check: ContextCheck,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub fn new(name: impl Into<String>, context_check: ContextCheck) -> Self {
        Self {
            name: name.into(),
            context_check,
        }
    }

    /// Set the store name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the off-context diagnostic policy
    #[must_use]
    pub const fn with_context_check(mut self, context_check: ContextCheck) -> Self {
        self.context_check = context_check;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            context_check: ContextCheck::default(),
        }
    }
}

/// Internal: counts queued actions and running async tasks
///
/// Reaching zero wakes everyone waiting in [`InFlight::wait_idle`].
struct InFlight {
    count: AtomicUsize,
    idle: watch::Sender<()>,
}

impl InFlight {
    fn new() -> Self {
        let (idle, _) = watch::channel(());
        Self {
            count: AtomicUsize::new(0),
            idle,
        }
    }

    fn enter(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.send_replace(());
        }
    }

    fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        // Subscribe before checking so a concurrent exit cannot be missed
        let mut idle = self.idle.subscribe();
        while self.pending() > 0 {
            if idle.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Internal: RAII guard that leaves [`InFlight`] on drop
///
/// Keeps the count accurate even if an async handler panics.
struct ExitGuard<'a>(&'a InFlight);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

// Re-export for convenience
pub use observable::{Observable, Subscription};
pub use store::{Dispatch, Store, WeakStore, on_mutation_context};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn config_builders_override_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.name, "store");
        assert_eq!(config.context_check, ContextCheck::Warn);

        let config = StoreConfig::new("a", ContextCheck::Warn)
            .with_name("b")
            .with_context_check(ContextCheck::Ignore);
        assert_eq!(config.name, "b");
        assert_eq!(config.context_check, ContextCheck::Ignore);
    }

    #[test]
    fn errors_render_messages() {
        assert_eq!(StoreError::Stopped.to_string(), "Store mutation executor has stopped");
        assert_eq!(
            StoreError::Timeout { pending: 2 }.to_string(),
            "Store did not settle: 2 actions or tasks still in flight"
        );
    }

    #[tokio::test]
    async fn in_flight_wakes_waiters_at_zero() {
        let in_flight = Arc::new(InFlight::new());
        in_flight.enter();
        in_flight.enter();

        let waiter = {
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move { in_flight.wait_idle().await })
        };

        in_flight.exit();
        assert_eq!(in_flight.pending(), 1);
        drop(ExitGuard(&in_flight));
        assert_eq!(in_flight.pending(), 0);

        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_idle() {
        let in_flight = InFlight::new();
        let waited = tokio::time::timeout(Duration::from_millis(100), in_flight.wait_idle()).await;
        assert!(waited.is_ok());
    }
}
