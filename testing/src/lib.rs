//! # Async Action Testing
//!
//! Testing utilities and helpers for the Async Action architecture.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then tests for both reducer halves
//! - [`assertions`]: Effect assertions
//! - [`Recorder`]: A subscriber sink that records deliveries
//! - Store helpers for waiting on async work with a bounded timeout
//!
//! ## Example
//!
//! ```ignore
//! use async_action_testing::{Recorder, helpers};
//! use async_action_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_counter_flow() {
//!     let store = Store::new(CounterState::default(), CounterReducer);
//!     let counts = Recorder::new();
//!     let _subscription = store.subscribe_to(|s| s.counter, counts.sink());
//!
//!     helpers::send_and_settle(&store, CounterAction::Increase).await.unwrap();
//!
//!     assert_eq!(counts.values(), vec![0, 1]);
//! }
//! ```

/// Fluent reducer tests and effect assertions
pub mod reducer_test;

/// Recording subscriber sink
pub mod recorder;

/// Store test helpers
pub mod helpers {
    use async_action_core::reducer::Reducer;
    use async_action_runtime::{Store, StoreError};
    use std::time::Duration;

    /// How long helpers wait for a store to settle
    pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Send an action and wait until every chained action and async task finished
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Stopped`] if the store's executor is gone, or
    /// [`StoreError::Timeout`] if work is still in flight after
    /// [`SETTLE_TIMEOUT`].
    pub async fn send_and_settle<R: Reducer>(store: &Store<R>, action: R::Action) -> Result<(), StoreError> {
        store.send(action).await?;
        store.settle(SETTLE_TIMEOUT).await
    }

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG` and writes through the test harness's capture. Safe to
    /// call from every test; only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
///
/// Strategies for the core types, for use with proptest.
pub mod properties {
    use async_action_core::effect::{Effect, Priority};
    use proptest::prelude::*;

    /// Any priority hint, including none
    pub fn priority() -> impl Strategy<Value = Option<Priority>> {
        prop_oneof![
            Just(None),
            Just(Some(Priority::Background)),
            Just(Some(Priority::Utility)),
            Just(Some(Priority::Low)),
            Just(Some(Priority::Medium)),
            Just(Some(Priority::High)),
            Just(Some(Priority::UserInitiated)),
        ]
    }

    /// Any effect built from the given action strategies
    pub fn effect<A, X>(
        action: impl Strategy<Value = A> + 'static,
        async_action: impl Strategy<Value = X> + 'static,
    ) -> impl Strategy<Value = Effect<A, X>>
    where
        A: std::fmt::Debug + Clone + 'static,
        X: std::fmt::Debug + Clone + 'static,
    {
        prop_oneof![
            Just(Effect::None),
            action.prop_map(Effect::Send),
            (async_action, priority()).prop_map(|(action, priority)| Effect::Run(action, priority)),
        ]
    }
}

// Re-export commonly used items
pub use recorder::Recorder;
pub use reducer_test::{ReducerTest, assertions};
