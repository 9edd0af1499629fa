//! # Async Action Core
//!
//! Core traits and types for the Async Action architecture.
//!
//! This crate provides the data half of a unidirectional state container:
//! reducers describe what should happen next as [`Effect`](effect::Effect)
//! values, and the runtime crate interprets them.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a single store
//! - **Action**: Synchronous intent, reduced on the mutation context
//! - **`AsyncAction`**: Intent that must run off the mutation context (I/O, timers)
//! - **Reducer**: `(State, Action) → Effect` plus `AsyncAction → Future<Effect>`
//! - **Effect**: `None`, `Send(Action)` or `Run(AsyncAction, Priority?)`
//! - **Passthrough**: Versioned field wrapper that notifies on every write
//!
//! ## Example
//!
//! ```
//! use async_action_core::{effect::Effect, reducer::Reducer};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct SearchState {
//!     query: String,
//!     results: Vec<String>,
//! }
//!
//! enum SearchAction {
//!     QueryChanged(String),
//!     ResultsLoaded(Vec<String>),
//! }
//!
//! enum SearchAsyncAction {
//!     Fetch(String),
//! }
//!
//! struct SearchReducer;
//!
//! impl Reducer for SearchReducer {
//!     type State = SearchState;
//!     type Action = SearchAction;
//!     type AsyncAction = SearchAsyncAction;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SearchState,
//!         action: SearchAction,
//!     ) -> Effect<SearchAction, SearchAsyncAction> {
//!         match action {
//!             SearchAction::QueryChanged(query) => {
//!                 state.query.clone_from(&query);
//!                 Effect::run(SearchAsyncAction::Fetch(query))
//!             },
//!             SearchAction::ResultsLoaded(results) => {
//!                 state.results = results;
//!                 Effect::None
//!             },
//!         }
//!     }
//!
//!     async fn run(&self, action: SearchAsyncAction) -> Effect<SearchAction, SearchAsyncAction> {
//!         match action {
//!             SearchAsyncAction::Fetch(query) => {
//!                 Effect::send(SearchAction::ResultsLoaded(vec![query]))
//!             },
//!         }
//!     }
//! }
//! ```

/// Passthrough container - versioned values that notify on every write
pub mod passthrough;

/// Effect module - descriptions of what should happen after a reduction
///
/// Effects are values, not execution. A reducer returns exactly one effect
/// per call and the store decides how to carry it out:
///
/// - [`Effect::None`] ends the chain
/// - [`Effect::Send`] feeds another action into the reducer synchronously
/// - [`Effect::Run`] schedules the reducer's async handler on a new task
pub mod effect {
    use serde::{Deserialize, Serialize};

    /// Scheduling hint for asynchronous work
    ///
    /// Priorities are ordered from least to most urgent. They influence when a
    /// task gets to start but never whether it runs, so correctness must not
    /// depend on them.
    #[derive(
        Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    pub enum Priority {
        /// Work the user is not waiting for (cleanup, prefetching)
        Background,
        /// Long-running work with visible progress
        Utility,
        /// Below the default
        Low,
        /// The default when nothing else is specified
        #[default]
        Medium,
        /// Above the default
        High,
        /// Work the user is actively waiting on
        UserInitiated,
    }

    impl Priority {
        /// Whether tasks at this priority should yield to the scheduler before starting
        #[must_use]
        pub const fn is_deferred(self) -> bool {
            matches!(self, Self::Background | Self::Utility | Self::Low)
        }
    }

    /// Effect type - describes what should happen after an action is handled
    ///
    /// Exactly one variant is active per value, and consumers must handle all
    /// three. Equality is structural whenever both payload types support it,
    /// which makes reducers testable by comparing effects directly.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The synchronous action type fed back into `reduce`
    /// - `AsyncAction`: The asynchronous action type handed to `run`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Effect<Action, AsyncAction> {
        /// Terminal: no further work
        None,

        /// Reduce one more action synchronously, before anything else queued
        Send(Action),

        /// Execute the async handler on a new task, optionally with a priority hint
        Run(AsyncAction, Option<Priority>),
    }

    impl<Action, AsyncAction> Effect<Action, AsyncAction> {
        /// Request one more synchronous mutation cycle
        #[must_use]
        pub const fn send(action: Action) -> Self {
            Self::Send(action)
        }

        /// Request asynchronous execution with the default scheduling
        #[must_use]
        pub const fn run(action: AsyncAction) -> Self {
            Self::Run(action, None)
        }

        /// Request asynchronous execution with a scheduling hint
        #[must_use]
        pub const fn run_with_priority(action: AsyncAction, priority: Priority) -> Self {
            Self::Run(action, Some(priority))
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }

        /// The priority hint of a [`Effect::Run`], if any
        #[must_use]
        pub const fn priority(&self) -> Option<Priority> {
            match self {
                Self::Run(_, priority) => *priority,
                Self::None | Self::Send(_) => None,
            }
        }

        /// Transform the synchronous action payload
        ///
        /// Used to lift a child reducer's effects into a parent's action type.
        #[must_use]
        pub fn map_action<B, F>(self, f: F) -> Effect<B, AsyncAction>
        where
            F: FnOnce(Action) -> B,
        {
            match self {
                Self::None => Effect::None,
                Self::Send(action) => Effect::Send(f(action)),
                Self::Run(action, priority) => Effect::Run(action, priority),
            }
        }

        /// Transform the asynchronous action payload, keeping the priority
        #[must_use]
        pub fn map_async_action<B, F>(self, f: F) -> Effect<Action, B>
        where
            F: FnOnce(AsyncAction) -> B,
        {
            match self {
                Self::None => Effect::None,
                Self::Send(action) => Effect::Send(action),
                Self::Run(action, priority) => Effect::Run(f(action), priority),
            }
        }
    }

    impl<Action, AsyncAction> Default for Effect<Action, AsyncAction> {
        fn default() -> Self {
            Self::None
        }
    }
}

/// Reducer module - the contract every state machine implements
///
/// Reducers have two halves:
///
/// - `reduce`: synchronous, runs on the store's mutation context, the only
///   code allowed to touch state
/// - `run`: asynchronous, runs on its own task, never touches state and hands
///   results back as effects
///
/// Both halves default to returning [`Effect::None`](crate::effect::Effect::None),
/// so a reducer with no asynchronous actions only implements `reduce`.
pub mod reducer {
    use super::effect::Effect;
    use std::future::Future;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// The reducer instance is shared between the mutation context and every
    /// async task, so it must be `Send + Sync` and should not carry unsynchronized
    /// mutable state.
    ///
    /// # Example
    ///
    /// ```
    /// use async_action_core::{effect::Effect, reducer::Reducer};
    ///
    /// #[derive(Clone, Debug, Default, PartialEq)]
    /// struct CounterState {
    ///     count: i64,
    /// }
    ///
    /// enum CounterAction {
    ///     Increment,
    /// }
    ///
    /// struct CounterReducer;
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = CounterState;
    ///     type Action = CounterAction;
    ///     type AsyncAction = ();
    ///
    ///     fn reduce(&self, state: &mut CounterState, action: CounterAction) -> Effect<CounterAction, ()> {
    ///         match action {
    ///             CounterAction::Increment => state.count += 1,
    ///         }
    ///         Effect::None
    ///     }
    /// }
    /// ```
    pub trait Reducer: Send + Sync + 'static {
        /// The state type this reducer operates on
        ///
        /// Equality drives subscription deduplication; `Clone` produces the
        /// snapshots handed to observers.
        type State: Clone + PartialEq + Send + Sync + 'static;

        /// Synchronous actions, reduced on the mutation context
        type Action: Send + 'static;

        /// Asynchronous actions, handled on spawned tasks
        type AsyncAction: Send + 'static;

        /// Reduce an action into a state change and a follow-up effect
        ///
        /// Must not block or await. Invoked only on the mutation context.
        fn reduce(
            &self,
            _state: &mut Self::State,
            _action: Self::Action,
        ) -> Effect<Self::Action, Self::AsyncAction> {
            Effect::None
        }

        /// Handle an async action off the mutation context
        ///
        /// May suspend arbitrarily. The returned effect is typically
        /// [`Effect::Send`] carrying the result back into `reduce`.
        fn run(
            &self,
            _action: Self::AsyncAction,
        ) -> impl Future<Output = Effect<Self::Action, Self::AsyncAction>> + Send {
            async { Effect::None }
        }
    }
}

pub use effect::{Effect, Priority};
pub use passthrough::Passthrough;
pub use reducer::Reducer;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Action {
        First,
        Second,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum AsyncAction {
        Load,
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct State {
        count: u32,
    }

    struct SyncOnly;

    impl Reducer for SyncOnly {
        type State = State;
        type Action = Action;
        type AsyncAction = AsyncAction;

        fn reduce(&self, state: &mut State, action: Action) -> Effect<Action, AsyncAction> {
            state.count += 1;
            match action {
                Action::First => Effect::send(Action::Second),
                Action::Second => Effect::run(AsyncAction::Load),
            }
        }
    }

    struct AsyncOnly;

    impl Reducer for AsyncOnly {
        type State = State;
        type Action = Action;
        type AsyncAction = AsyncAction;

        async fn run(&self, action: AsyncAction) -> Effect<Action, AsyncAction> {
            match action {
                AsyncAction::Load => Effect::send(Action::First),
            }
        }
    }

    #[test]
    fn effects_compare_structurally() {
        let effect: Effect<Action, AsyncAction> = Effect::send(Action::First);
        assert_eq!(effect, Effect::Send(Action::First));
        assert_ne!(effect, Effect::send(Action::Second));
        assert_ne!(Effect::<Action, _>::run(AsyncAction::Load), Effect::run_with_priority(AsyncAction::Load, Priority::High));
    }

    #[test]
    fn priority_is_only_reported_for_run() {
        assert_eq!(Effect::<Action, _>::run_with_priority(AsyncAction::Load, Priority::Low).priority(), Some(Priority::Low));
        assert_eq!(Effect::<Action, AsyncAction>::run(AsyncAction::Load).priority(), None);
        assert_eq!(Effect::<_, AsyncAction>::send(Action::First).priority(), None);
        assert!(Effect::<Action, AsyncAction>::default().is_none());
    }

    #[test]
    fn priorities_are_ordered_by_urgency() {
        assert!(Priority::Background < Priority::Medium);
        assert!(Priority::UserInitiated > Priority::High);
        assert!(Priority::Low.is_deferred());
        assert!(!Priority::default().is_deferred());
    }

    #[test]
    fn map_action_lifts_send_only() {
        let lifted = Effect::<_, AsyncAction>::send(Action::First).map_action(|_| "parent");
        assert_eq!(lifted, Effect::Send("parent"));

        let untouched = Effect::<Action, _>::run_with_priority(AsyncAction::Load, Priority::High)
            .map_action(|_| "parent");
        assert_eq!(untouched, Effect::Run(AsyncAction::Load, Some(Priority::High)));
    }

    #[test]
    fn map_async_action_keeps_priority() {
        let lifted = Effect::<Action, _>::run_with_priority(AsyncAction::Load, Priority::Background)
            .map_async_action(|_| 7_u8);
        assert_eq!(lifted, Effect::Run(7, Some(Priority::Background)));
    }

    #[test]
    fn reduce_without_run_uses_default_handler() {
        let mut state = State::default();
        assert_eq!(SyncOnly.reduce(&mut state, Action::First), Effect::Send(Action::Second));
        assert_eq!(SyncOnly.reduce(&mut state, Action::Second), Effect::Run(AsyncAction::Load, None));
        assert_eq!(state.count, 2);

        let effect = tokio_test::block_on(SyncOnly.run(AsyncAction::Load));
        assert!(effect.is_none());
    }

    #[test]
    fn run_without_reduce_uses_default_reducer() {
        let mut state = State::default();
        assert!(AsyncOnly.reduce(&mut state, Action::First).is_none());
        assert_eq!(state, State::default());

        let effect = tokio_test::block_on(AsyncOnly.run(AsyncAction::Load));
        assert_eq!(effect, Effect::Send(Action::First));
    }
}
