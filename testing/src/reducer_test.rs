//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing both halves of a reducer with
//! readable Given-When-Then syntax, without spinning up a store.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use async_action_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A, X> = Box<dyn FnOnce(&Effect<A, X>)>;

/// What the test feeds the reducer
enum Input<A, X> {
    Action(A),
    AsyncAction(X),
}

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use async_action_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(CounterReducer)
///     .given_state(CounterState::default())
///     .when_action(CounterAction::Increase)
///     .then_state(|state| assert_eq!(state.counter, 1))
///     .then_effect(assertions::assert_no_effect)
///     .run();
///
/// ReducerTest::new(CounterReducer)
///     .when_async_action(CounterAsyncAction::Fetch)
///     .then_effect(|effect| assertions::assert_send(effect, &CounterAction::Loaded))
///     .run_async()
///     .await;
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    initial_state: Option<R::State>,
    input: Option<Input<R::Action, R::AsyncAction>>,
    state_assertions: Vec<StateAssertion<R::State>>,
    effect_assertions: Vec<EffectAssertion<R::Action, R::AsyncAction>>,
}

impl<R: Reducer> ReducerTest<R> {
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            initial_state: None,
            input: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the synchronous action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.input = Some(Input::Action(action));
        self
    }

    /// Set the asynchronous action to test (When)
    ///
    /// Requires [`run_async`](Self::run_async). State assertions are ignored,
    /// since the async half never sees state.
    #[must_use]
    pub fn when_async_action(mut self, action: R::AsyncAction) -> Self {
        self.input = Some(Input::AsyncAction(action));
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effect (Then)
    #[must_use]
    pub fn then_effect<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Effect<R::Action, R::AsyncAction>) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run a synchronous test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or action is not set, if an async action was
    /// given, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = match self.input.expect("Action must be set with when_action()") {
            Input::Action(action) => action,
            Input::AsyncAction(_) => panic!("Async actions must be tested with run_async()"),
        };

        // Execute reducer
        let effect = self.reducer.reduce(&mut state, action);

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effect);
        }
    }

    /// Run either half and execute all assertions
    ///
    /// Synchronous actions behave exactly like [`run`](Self::run).
    ///
    /// # Panics
    ///
    /// Panics if no action is set, if a synchronous action has no initial
    /// state, or if any assertion fails.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub async fn run_async(self) {
        match self.input.expect("Action must be set with when_action() or when_async_action()") {
            Input::Action(action) => Self {
                input: Some(Input::Action(action)),
                ..self
            }
            .run(),
            Input::AsyncAction(action) => {
                let effect = self.reducer.run(action).await;
                for assertion in self.effect_assertions {
                    assertion(&effect);
                }
            },
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use async_action_core::effect::{Effect, Priority};
    use std::fmt::Debug;

    /// Assert that the effect is `Effect::None`
    ///
    /// # Panics
    ///
    /// Panics if the effect is not `None`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effect<A: Debug, X: Debug>(effect: &Effect<A, X>) {
        assert!(effect.is_none(), "Expected no effect, but found {effect:?}");
    }

    /// Assert that the effect sends `expected`
    ///
    /// # Panics
    ///
    /// Panics if the effect is not `Send(expected)`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_send<A, X>(effect: &Effect<A, X>, expected: &A)
    where
        A: Debug + PartialEq,
        X: Debug,
    {
        match effect {
            Effect::Send(action) => assert_eq!(action, expected, "Send effect carries a different action"),
            other => panic!("Expected Send({expected:?}), but found {other:?}"),
        }
    }

    /// Assert that the effect runs `expected`, at any priority
    ///
    /// # Panics
    ///
    /// Panics if the effect is not `Run(expected, _)`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_run<A, X>(effect: &Effect<A, X>, expected: &X)
    where
        A: Debug,
        X: Debug + PartialEq,
    {
        match effect {
            Effect::Run(action, _) => assert_eq!(action, expected, "Run effect carries a different async action"),
            other => panic!("Expected Run({expected:?}, _), but found {other:?}"),
        }
    }

    /// Assert that the effect is a `Run` with the given priority hint
    ///
    /// # Panics
    ///
    /// Panics if the effect is not a `Run` or carries another priority.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_run_priority<A: Debug, X: Debug>(effect: &Effect<A, X>, expected: Option<Priority>) {
        assert!(
            matches!(effect, Effect::Run(..)),
            "Expected a Run effect, but found {effect:?}"
        );
        assert_eq!(effect.priority(), expected, "Run effect has a different priority");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_action_core::effect::Priority;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        Load,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAsyncAction {
        Fetch,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type AsyncAction = TestAsyncAction;

        fn reduce(&self, state: &mut TestState, action: TestAction) -> Effect<TestAction, TestAsyncAction> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    Effect::None
                },
                TestAction::Decrement => {
                    state.count -= 1;
                    Effect::send(TestAction::Increment)
                },
                TestAction::Load => Effect::run_with_priority(TestAsyncAction::Fetch, Priority::Utility),
            }
        }

        async fn run(&self, action: TestAsyncAction) -> Effect<TestAction, TestAsyncAction> {
            match action {
                TestAsyncAction::Fetch => Effect::send(TestAction::Increment),
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effect(assertions::assert_no_effect)
            .run();
    }

    #[test]
    fn test_reducer_test_decrement_chains_send() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Decrement)
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .then_effect(|effect| assertions::assert_send(effect, &TestAction::Increment))
            .run();
    }

    #[test]
    fn test_reducer_test_run_effect() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Load)
            .then_effect(|effect| assertions::assert_run(effect, &TestAsyncAction::Fetch))
            .then_effect(|effect| assertions::assert_run_priority(effect, Some(Priority::Utility)))
            .run();
    }

    #[tokio::test]
    async fn test_reducer_test_async_half() {
        ReducerTest::new(TestReducer)
            .when_async_action(TestAsyncAction::Fetch)
            .then_effect(|effect| assertions::assert_send(effect, &TestAction::Increment))
            .run_async()
            .await;
    }

    #[tokio::test]
    async fn test_run_async_accepts_sync_actions() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 1 })
            .when_action(TestAction::Increment)
            .then_state(|state| assert_eq!(state.count, 2))
            .run_async()
            .await;
    }

    #[test]
    #[should_panic(expected = "run_async")]
    fn test_run_rejects_async_actions() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_async_action(TestAsyncAction::Fetch)
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected Send")]
    fn test_assert_send_rejects_none() {
        assertions::assert_send::<TestAction, TestAsyncAction>(&Effect::None, &TestAction::Increment);
    }
}
