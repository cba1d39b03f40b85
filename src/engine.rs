use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::action::Action;
use crate::action_sender::ActionSender;
use crate::bus::{ActionBus, EventReceiver, Pattern};
use crate::change_observer::ChangeObserver;
use crate::reducer::Reducer;
use crate::state_provider::{BorrowedState, StateProvider};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Owns the state tree. Reduces every dispatched action synchronously and
/// then hands it to the action bus.
pub struct StoreEngine {
    state: RwLock<Value>,
    // Held from reduce to publish so bus order matches reduce order.
    dispatching: Mutex<()>,
    reducer: Arc<dyn Reducer + 'static>,
    bus: Arc<ActionBus>,
    changes: broadcast::Sender<()>,
}

impl StoreEngine {
    pub fn new(state: Value, reducer: impl Reducer + 'static) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(state),
            dispatching: Mutex::new(()),
            reducer: Arc::new(reducer),
            bus: Arc::new(ActionBus::new()),
            changes,
        }
    }

    pub(crate) fn bus(&self) -> Arc<ActionBus> {
        self.bus.clone()
    }

    pub(crate) fn subscribe(&self, pattern: Pattern) -> EventReceiver<Action> {
        self.bus.subscribe(pattern)
    }

    pub(crate) fn dispatch(&self, action: Action) {
        log::debug!("Handling {:?}", action);
        let _dispatching = self.dispatching.lock();
        {
            let mut state = self.state.write();
            let state_before = state.clone();
            self.reducer.reduce(&mut state, &action);
            if state_before != *state {
                // Nobody listening is fine.
                let _ = self.changes.send(());
            }
        }
        self.bus.publish(&action);
    }
}

impl StateProvider for StoreEngine {
    type State = Value;

    fn state(&self) -> BorrowedState<'_, Value> {
        RwLockReadGuard::map(self.state.read(), |state| state)
    }
}

impl ActionSender for StoreEngine {
    fn send(&self, action: Action) {
        self.dispatch(action);
    }
}

impl ChangeObserver for StoreEngine {
    fn observe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn counter(state: &mut Value, action: &Action) {
        if action.kind() == "INCREMENT" {
            let value = state["value"].as_i64().unwrap_or_default();
            state["value"] = json!(value + 1);
        }
    }

    #[tokio::test]
    async fn test_dispatch_reduces_then_publishes() {
        let engine = StoreEngine::new(json!({"value": 0}), counter);
        let mut receiver = engine.subscribe(Pattern::Any);

        engine.send(Action::new("INCREMENT"));

        assert_eq!(*engine.state(), json!({"value": 1}));
        let published = receiver.recv().await.unwrap();
        assert_eq!(published.kind(), "INCREMENT");
    }

    #[tokio::test]
    async fn test_change_notifications() {
        let engine = StoreEngine::new(json!({"value": 0}), counter);
        let mut changes = engine.observe();

        engine.send(Action::new("NOOP"));
        assert!(changes.try_recv().is_err());

        engine.send(Action::new("INCREMENT"));
        assert!(changes.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_predicate_reads_reduced_state() {
        let engine = Arc::new(StoreEngine::new(json!({"value": 0}), counter));
        let weak = Arc::downgrade(&engine);
        let mut receiver = engine.subscribe(Pattern::predicate(move |_action| {
            let Some(engine) = weak.upgrade() else {
                return false;
            };
            let value = engine.state()["value"].clone();
            value == json!(1)
        }));

        engine.send(Action::new("INCREMENT"));

        let published = receiver.recv().await.unwrap();
        assert_eq!(published.kind(), "INCREMENT");
    }
}
