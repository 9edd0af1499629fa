//! # Counter Example
//!
//! A small counter demonstrating the Async Action architecture.
//!
//! This example showcases:
//! - A synchronous reducer that owns all state changes
//! - An async handler that waits and feeds an action back
//! - A [`Passthrough`] log field whose every write is observable
//! - Whole-state, field and passthrough subscriptions
//!
//! ## Architecture
//!
//! `reduce` mutates [`CounterState`] on the store's mutation context.
//! `LogCount` writes the current count into the log even when it did not
//! change, so passthrough subscribers see each log request while plain
//! subscribers only see new content. `IncreaseLater` hands off to the async
//! half, which sleeps and then sends `Increase` back.
//!
//! ## Example
//!
//! ```no_run
//! use async_action_runtime::Store;
//! use counter::{CounterAction, CounterReducer, CounterState};
//!
//! # async fn example() -> Result<(), async_action_runtime::StoreError> {
//! let store = Store::new(CounterState::default(), CounterReducer::new());
//!
//! store.send(CounterAction::Increase).await?;
//! let counter = store.state(|s| s.counter);
//! assert_eq!(counter, 1);
//! # Ok(())
//! # }
//! ```

use async_action_core::{effect::Effect, passthrough::Passthrough, reducer::Reducer};
use std::time::Duration;

/// Counter state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count value
    pub counter: i64,
    /// Last logged count, notified on every log request
    pub log: Passthrough<Option<String>>,
}

/// Counter actions
///
/// Processed synchronously on the mutation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Increment the counter by 1
    Increase,
    /// Write the current count to the log
    LogCount,
    /// Replace the whole state with the default
    ResetState,
    /// Increment the counter by 1 after `delay`
    IncreaseLater(Duration),
}

/// Counter async actions
///
/// Handled off the mutation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAsyncAction {
    /// Sleep, then send `Increase`
    Delay(Duration),
}

/// Counter reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl CounterReducer {
    /// Create a new counter reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type AsyncAction = CounterAsyncAction;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
    ) -> Effect<Self::Action, Self::AsyncAction> {
        match action {
            CounterAction::Increase => {
                state.counter += 1;
                Effect::None
            },
            CounterAction::LogCount => {
                state.log.set(Some(state.counter.to_string()));
                Effect::None
            },
            CounterAction::ResetState => {
                *state = CounterState::default();
                Effect::None
            },
            CounterAction::IncreaseLater(delay) => Effect::run(CounterAsyncAction::Delay(delay)),
        }
    }

    async fn run(&self, action: Self::AsyncAction) -> Effect<Self::Action, Self::AsyncAction> {
        match action {
            CounterAsyncAction::Delay(delay) => {
                tokio::time::sleep(delay).await;
                tracing::debug!(?delay, "Delay elapsed, increasing");
                Effect::send(CounterAction::Increase)
            },
        }
    }
}
