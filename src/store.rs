use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinSet};

use crate::action::Action;
use crate::action_sender::ActionSender;
use crate::bus::Pattern;
use crate::change_observer::ChangeObserver;
use crate::context::Context;
use crate::coordinator;
use crate::engine::StoreEngine;
use crate::error::{Error, Result};
use crate::reducer::Reducer;
use crate::state_mapper::StateMapper;
use crate::state_provider::{AnyStateProvider, BorrowedState, StateProvider};

/// Handle on a standing watcher task.
#[derive(Clone)]
pub struct Watcher {
    handle: AbortHandle,
}

impl Watcher {
    /// Stops the watcher and every task it started that is still running.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// The state container: one state tree, one root reducer, and the
/// primitives effects run on (`select`, `put`, `take`, `take_every`).
///
/// Must be created inside a tokio runtime. Watchers started from a store
/// are stopped when it is dropped.
pub struct Store {
    engine: Arc<StoreEngine>,
    watchers: Mutex<Vec<AbortHandle>>,
    coordinator_started: AtomicBool,
}

impl Store {
    pub fn new(state: Value, reducer: impl Reducer + 'static) -> Self {
        let engine = Arc::new(StoreEngine::new(state, reducer));
        engine.dispatch(Action::init());
        Self {
            engine,
            watchers: Mutex::new(Vec::new()),
            coordinator_started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BorrowedState<'_, Value> {
        self.engine.state()
    }

    /// Copy of the current state tree.
    pub fn snapshot(&self) -> Value {
        self.engine.state().clone()
    }

    /// Read-only view of the top-level slice `key`. Reads `null` while the
    /// slice does not exist.
    pub fn scope(&self, key: impl Into<String>) -> impl StateProvider<State = Value> {
        let key = key.into();
        let parent = AnyStateProvider::new(self.engine.clone());
        StateMapper::new(parent, move |state| &state[key.as_str()])
    }

    pub fn context(&self) -> Context {
        Context::new(self.engine.clone(), self.engine.clone()).with_bus(self.engine.bus())
    }

    /// Resolves with the next dispatched action matching `pattern`.
    ///
    /// Subscribes immediately, so this may be called before the dispatch it
    /// waits for.
    pub fn take(&self, pattern: impl Into<Pattern>) -> impl Future<Output = Option<Action>> {
        let mut receiver = self.engine.subscribe(pattern.into());
        async move { receiver.recv().await }
    }

    /// Starts a standing watcher running `handler` on its own task for every
    /// dispatched action matching `pattern`. Handlers run concurrently; one
    /// failing does not affect the others.
    pub fn take_every<H, Fut>(&self, pattern: impl Into<Pattern>, handler: H) -> Watcher
    where
        H: Fn(Context, Action) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pattern = pattern.into();
        log::debug!("Watching every {:?}", pattern);
        let mut receiver = self.engine.subscribe(pattern);
        let ctx = self.context();

        let handle = tokio::spawn(async move {
            let mut join_set: JoinSet<()> = JoinSet::new();

            loop {
                tokio::select! {
                    Some(action) = receiver.recv() => {
                        let _handle = join_set.spawn(handler(ctx.clone(), action));
                    }
                    Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
                        if let Err(err) = joined {
                            log::error!("Watcher task crashed: {err}");
                        }
                    }
                    else => break,
                }
            }
        });

        let handle = handle.abort_handle();
        self.watchers.lock().push(handle.clone());
        Watcher { handle }
    }

    /// Starts the completion coordinator: every wrapped action is run on
    /// its own task and followed by a `COMPLETED` or `ERROR` action.
    pub fn start_coordinator(&self) -> Result<Watcher> {
        if self.coordinator_started.swap(true, Ordering::SeqCst) {
            return Err(Error::CoordinatorRunning);
        }
        Ok(self.take_every(
            Pattern::predicate(Action::is_wrapped),
            coordinator::handle_action,
        ))
    }

    pub fn dispatch(&self, action: Action) {
        self.engine.dispatch(action);
    }
}

impl ActionSender for Store {
    fn send(&self, action: Action) {
        self.dispatch(action);
    }
}

impl ChangeObserver for Store {
    fn observe(&self) -> broadcast::Receiver<()> {
        self.engine.observe()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        for handle in self.watchers.lock().drain(..) {
            handle.abort();
        }
    }
}
