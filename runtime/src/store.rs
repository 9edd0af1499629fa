//! Store runtime for coordinating reducer execution and effect handling.
//!
//! Every store spawns a mutation executor: a Tokio task that exclusively owns
//! the state and drains an unbounded mailbox of actions. It is the only place
//! `Reducer::reduce` runs, so state needs no lock. Code running inside it
//! carries a task-local tag identifying the store, which is how
//! [`Store::is_mutation_context`] answers.
//!
//! ```text
//!  send(A) ──► mailbox ──► executor: reduce(A) ─► publish ─► Effect
//!                 ▲                                  │
//!                 │            Send(B) ◄─────────────┤ (loop, same turn)
//!                 │                                  │
//!                 └── Send(C) ◄── task: run(X) ◄─────┘ Run(X)
//! ```
//!
//! `Effect::Send` chains are reduced depth-first within one executor turn, so
//! nothing queued behind them can interleave. `Effect::Run` spawns a task that
//! awaits the async handler; its own `Send` re-enters the mailbox when it
//! completes, and its `Run` spawns the next task directly.

use crate::metrics::StoreMetrics;
use crate::observable::{Observable, Subscription};
use crate::{ContextCheck, ExitGuard, InFlight, StoreConfig, StoreError};
use async_action_core::{
    effect::{Effect, Priority},
    passthrough::Passthrough,
    reducer::Reducer,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

tokio::task_local! {
    /// Identity of the store whose mutation executor is running this code
    static MUTATION_CONTEXT: u64;
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Whether the caller is running on any store's mutation executor
///
/// Reducers can use this to assert they are never invoked elsewhere.
#[must_use]
pub fn on_mutation_context() -> bool {
    MUTATION_CONTEXT.try_with(|_| ()).is_ok()
}

/// Closure scheduled onto the mutation context by [`Store::perform`]
type Job<R> = Box<dyn FnOnce(&Store<R>) + Send>;

/// Work item for the mutation executor
enum Envelope<R: Reducer> {
    Action {
        action: R::Action,
        done: Option<oneshot::Sender<()>>,
    },
    Perform {
        job: Job<R>,
        done: oneshot::Sender<()>,
    },
}

/// State shared by every handle to one store
struct Shared<R: Reducer> {
    context_id: u64,
    reducer: R,
    config: StoreConfig,
    mailbox: mpsc::UnboundedSender<Envelope<R>>,
    state: Observable<R::State>,
    in_flight: InFlight,
    warned_off_context: AtomicBool,
}

/// Completion of a dispatched action
///
/// The action is already queued when this is returned; awaiting only waits
/// for the mutation executor to finish reducing it together with every
/// `Effect::Send` it chained. Async work it started may still be running.
/// Dropping a `Dispatch` does not cancel anything.
///
/// Resolves to [`StoreError::Stopped`] if the executor is gone.
#[derive(Debug)]
pub struct Dispatch {
    completion: oneshot::Receiver<()>,
}

impl Future for Dispatch {
    type Output = Result<(), StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.completion)
            .poll(cx)
            .map(|result| result.map_err(|_| StoreError::Stopped))
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (owned by the mutation executor, published as snapshots)
/// 2. Reducer (shared by the executor and every async task)
/// 3. Effect interpretation (the send/run feedback loop)
/// 4. Subscriptions (whole state, projected field, passthrough field)
///
/// Cloning is cheap and yields another handle to the same store. The
/// executor stops once every handle has been dropped.
///
/// # Example
///
/// ```ignore
/// let store = Store::new(CounterState::default(), CounterReducer);
///
/// let _counts = store.subscribe_to(|s| s.count, |count| println!("count = {count}"));
///
/// store.send(CounterAction::Increment).await?;
/// assert_eq!(store.state(|s| s.count), 1);
/// ```
pub struct Store<R: Reducer> {
    shared: Arc<Shared<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Reducer> std::fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.shared.config.name)
            .field("context_id", &self.shared.context_id)
            .field("pending", &self.shared.in_flight.pending())
            .finish_non_exhaustive()
    }
}

impl<R: Reducer> Store<R> {
    /// Create a new store with initial state and reducer
    ///
    /// Uses [`StoreConfig::default`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the mutation executor
    /// is spawned immediately.
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R) -> Self {
        Self::with_config(initial_state, reducer, StoreConfig::default())
    }

    /// Create a new store with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_config(initial_state: R::State, reducer: R, config: StoreConfig) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let context_id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);

        let shared = Arc::new(Shared {
            context_id,
            reducer,
            config,
            mailbox,
            state: Observable::new(initial_state.clone()),
            in_flight: InFlight::new(),
            warned_off_context: AtomicBool::new(false),
        });

        let executor = MutationExecutor {
            shared: Arc::downgrade(&shared),
            inbox,
            state: initial_state,
        };
        let span = tracing::debug_span!(
            "mutation_executor",
            store = %shared.config.name,
            context_id
        );
        tokio::spawn(MUTATION_CONTEXT.scope(context_id, executor.run().instrument(span)));

        tracing::debug!(store = %shared.config.name, context_id, "Store created");
        Self { shared }
    }

    /// Send an action to the store
    ///
    /// The action is queued on the mutation executor, which reduces it and
    /// then follows the returned effect:
    ///
    /// - `Effect::None` ends the chain
    /// - `Effect::Send(next)` reduces `next` immediately, before anything else queued
    /// - `Effect::Run(action, priority)` spawns the async handler and ends the chain
    ///
    /// Calling this outside the mutation context is a contract violation that
    /// is reported according to [`StoreConfig::context_check`]; the action is
    /// still dispatched, redirected through the executor's queue.
    ///
    /// On the mutation context (inside [`perform`](Self::perform) or a
    /// subscriber callback) the action is queued too, not reduced inline: it
    /// runs after the current envelope finishes, so state read right after
    /// `send` returns does not reflect it yet.
    ///
    /// Await the returned [`Dispatch`] to wait until the chain is applied.
    #[tracing::instrument(skip(self, action), fields(store = %self.shared.config.name), name = "store_send")]
    pub fn send(&self, action: R::Action) -> Dispatch {
        if !self.is_mutation_context() {
            self.report_off_context();
        }

        let (done, completion) = oneshot::channel();
        self.enqueue(Envelope::Action {
            action,
            done: Some(done),
        });
        Dispatch { completion }
    }

    /// Run a closure on the mutation context
    ///
    /// Sends issued from inside `job` are in-context. The returned
    /// [`Dispatch`] resolves after `job` returns; actions it sent are queued
    /// behind it.
    pub fn perform<F>(&self, job: F) -> Dispatch
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let (done, completion) = oneshot::channel();
        self.enqueue(Envelope::Perform {
            job: Box::new(job),
            done,
        });
        Dispatch { completion }
    }

    /// Execute an async action on a new task
    ///
    /// The reducer's async handler runs off the mutation context. Its effect
    /// is then followed:
    ///
    /// - `Effect::None` ends the task
    /// - `Effect::Send(action)` queues `action` on the mutation executor
    /// - `Effect::Run(next, priority)` chains another task
    ///
    /// `priority` is a hint: deferred priorities yield to the scheduler once
    /// before the handler starts.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[tracing::instrument(skip(self, action), fields(store = %self.shared.config.name), name = "store_run")]
    pub fn run(&self, action: R::AsyncAction, priority: Option<Priority>) {
        StoreMetrics::record_spawn();
        self.shared.in_flight.enter();

        let store = self.clone();
        let span = tracing::trace_span!("async_action", ?priority);
        tokio::spawn(
            async move {
                let _guard = ExitGuard(&store.shared.in_flight);

                if priority.is_some_and(Priority::is_deferred) {
                    tokio::task::yield_now().await;
                }

                let effect = store.shared.reducer.run(action).await;
                store.follow_async(effect);
            }
            .instrument(span),
        );
    }

    /// Clone of the current state
    #[must_use]
    pub fn current_state(&self) -> R::State {
        self.shared.state.get()
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let count = store.state(|s| s.count);
    /// ```
    ///
    /// The closure must not subscribe to this store.
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        self.shared.state.with(f)
    }

    /// Subscribe to the whole state
    ///
    /// `sink` receives the current state immediately, then every new state
    /// that differs from the last one it received. Deliveries happen on the
    /// mutation context.
    pub fn subscribe<S>(&self, sink: S) -> Subscription
    where
        S: Fn(&R::State) + Send + Sync + 'static,
    {
        StoreMetrics::record_subscription("state");
        self.shared.state.subscribe(sink)
    }

    /// Subscribe to one projected field
    ///
    /// Deduplicated by equality of the projected value only.
    pub fn subscribe_to<V, P, S>(&self, project: P, sink: S) -> Subscription
    where
        V: PartialEq + Send + 'static,
        P: Fn(&R::State) -> V + Send + Sync + 'static,
        S: Fn(&V) + Send + Sync + 'static,
    {
        StoreMetrics::record_subscription("field");
        self.shared.state.subscribe_map(project, sink)
    }

    /// Subscribe to a [`Passthrough`] field
    ///
    /// Deduplicated by write version instead of value, so every write reaches
    /// `sink`, including writes that repeat the current content. The sink
    /// receives the unwrapped value.
    pub fn subscribe_passthrough<V, P, S>(&self, project: P, sink: S) -> Subscription
    where
        V: Clone + Send + Sync + 'static,
        P: Fn(&R::State) -> &Passthrough<V> + Send + Sync + 'static,
        S: Fn(&V) + Send + Sync + 'static,
    {
        StoreMetrics::record_subscription("passthrough");
        self.shared.state.subscribe_filtered(
            move |state: &R::State| project(state).clone(),
            Passthrough::same_write,
            move |field: &Passthrough<V>| sink(field.value()),
        )
    }

    /// Whether the caller is running on this store's mutation executor
    #[must_use]
    pub fn is_mutation_context(&self) -> bool {
        MUTATION_CONTEXT
            .try_with(|id| *id == self.shared.context_id)
            .unwrap_or(false)
    }

    /// Queued actions plus running async tasks
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.in_flight.pending()
    }

    /// Wait until no action is queued and no async task is running
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if work is still in flight when
    /// `timeout` elapses, or [`StoreError::Stopped`] once idle if the mutation
    /// executor is gone.
    pub async fn settle(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.shared.in_flight.wait_idle())
            .await
            .map_err(|_| StoreError::Timeout {
                pending: self.pending(),
            })?;

        if self.shared.mailbox.is_closed() {
            return Err(StoreError::Stopped);
        }
        Ok(())
    }

    /// Non-owning handle, for subscribers that need to send back into the store
    ///
    /// A subscriber holding a full `Store` would keep the store alive forever.
    #[must_use]
    pub fn downgrade(&self) -> WeakStore<R> {
        WeakStore {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The store's configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    fn enqueue(&self, envelope: Envelope<R>) {
        self.shared.in_flight.enter();
        if self.shared.mailbox.send(envelope).is_err() {
            self.shared.in_flight.exit();
            tracing::warn!(store = %self.shared.config.name, "Mutation executor has stopped, dropping envelope");
        }
    }

    fn report_off_context(&self) {
        StoreMetrics::record_off_context_send();
        let first = !self.shared.warned_off_context.swap(true, Ordering::Relaxed);
        match self.shared.config.context_check {
            ContextCheck::Warn if first => tracing::warn!(
                store = %self.shared.config.name,
                "send called outside the mutation context, redirecting onto the mutation executor"
            ),
            ContextCheck::Warn | ContextCheck::Ignore => {
                tracing::trace!("Redirecting off-context send onto the mutation executor");
            },
        }
    }

    /// Reduce `action` and every `Effect::Send` it chains
    ///
    /// Runs only on the mutation executor.
    fn reduce_chain(&self, state: &mut R::State, action: R::Action) {
        let mut next = Some(action);
        while let Some(action) = next.take() {
            let start = Instant::now();
            let effect = self.shared.reducer.reduce(state, action);
            StoreMetrics::record_reduce(start.elapsed());

            self.shared.state.publish(state.clone());

            match effect {
                Effect::None => {
                    tracing::trace!("Reducer returned Effect::None");
                    StoreMetrics::record_effect("none");
                },
                Effect::Send(action) => {
                    tracing::trace!("Reducer returned Effect::Send, continuing chain");
                    StoreMetrics::record_effect("send");
                    next = Some(action);
                },
                Effect::Run(action, priority) => {
                    tracing::trace!(?priority, "Reducer returned Effect::Run, spawning task");
                    StoreMetrics::record_effect("run");
                    self.run(action, priority);
                },
            }
        }
    }

    /// Follow the effect returned by an async handler
    fn follow_async(&self, effect: Effect<R::Action, R::AsyncAction>) {
        match effect {
            Effect::None => {
                tracing::trace!("Async handler returned Effect::None");
                StoreMetrics::record_effect("none");
            },
            Effect::Send(action) => {
                tracing::trace!("Async handler returned Effect::Send, handing back to mutation executor");
                StoreMetrics::record_effect("send");
                self.enqueue(Envelope::Action { action, done: None });
            },
            Effect::Run(action, priority) => {
                tracing::trace!(?priority, "Async handler returned Effect::Run, chaining task");
                StoreMetrics::record_effect("run");
                self.run(action, priority);
            },
        }
    }
}

/// Weak handle to a [`Store`]
pub struct WeakStore<R: Reducer> {
    shared: Weak<Shared<R>>,
}

impl<R: Reducer> Clone for WeakStore<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<R: Reducer> WeakStore<R> {
    /// Recover the store if any strong handle is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<Store<R>> {
        self.shared.upgrade().map(|shared| Store { shared })
    }
}

/// The task behind a store's mutation context
struct MutationExecutor<R: Reducer> {
    shared: Weak<Shared<R>>,
    inbox: mpsc::UnboundedReceiver<Envelope<R>>,
    state: R::State,
}

impl<R: Reducer> MutationExecutor<R> {
    async fn run(mut self) {
        tracing::debug!("Mutation executor started");

        while let Some(envelope) = self.inbox.recv().await {
            let Some(shared) = self.shared.upgrade() else {
                break;
            };
            let store = Store { shared };

            // Released on unwind too, so a panicking reducer cannot strand `settle`
            let in_flight = ExitGuard(&store.shared.in_flight);
            let done = match envelope {
                Envelope::Action { action, done } => {
                    store.reduce_chain(&mut self.state, action);
                    done
                },
                Envelope::Perform { job, done } => {
                    job(&store);
                    Some(done)
                },
            };

            drop(in_flight);
            if let Some(done) = done {
                // The caller may have dropped its Dispatch
                let _ = done.send(());
            }
        }

        tracing::debug!("Mutation executor stopped");
    }
}

impl<R: Reducer> Drop for MutationExecutor<R> {
    fn drop(&mut self) {
        // Envelopes still queued will never run: release their in-flight
        // counts and fail their dispatches.
        self.inbox.close();
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        while self.inbox.try_recv().is_ok() {
            shared.in_flight.exit();
        }
    }
}
