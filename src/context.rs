use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::action::Action;
use crate::action_sender::{ActionSender, AnyActionSender};
use crate::bus::{ActionBus, Pattern};
use crate::effect::{Effect, EffectValue};
use crate::state_provider::{AnyStateProvider, StateProvider};

/// Handle an effect runs against: where state is read from and where
/// actions go.
#[derive(Clone)]
pub struct Context {
    state: AnyStateProvider,
    sink: AnyActionSender,
    bus: Option<Arc<ActionBus>>,
}

impl Context {
    pub fn new(
        state: Arc<dyn StateProvider<State = Value>>,
        sink: Arc<dyn ActionSender>,
    ) -> Self {
        Self {
            state: AnyStateProvider::new(state),
            sink: AnyActionSender::new(sink),
            bus: None,
        }
    }

    pub(crate) fn with_bus(mut self, bus: Arc<ActionBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Snapshot of the whole state tree.
    pub fn select(&self) -> Value {
        self.state.state().clone()
    }

    /// Snapshot of one top-level slice, `Null` when absent.
    pub fn select_slice(&self, key: &str) -> Value {
        self.state.state()[key].clone()
    }

    pub fn put(&self, action: Action) {
        self.sink.send(action);
    }

    pub async fn perform(&self, effect: Effect) {
        log::trace!("Performing {:?}", effect.value);
        match effect.value {
            EffectValue::None => {}
            EffectValue::Send(action) => self.put(action),
            EffectValue::Async(job) => job(self.clone()).await,
        }
    }

    /// Resolves with the next dispatched action matching `pattern`.
    ///
    /// The subscription is taken when this is called, so an action put right
    /// after is not missed. Resolves to `None` when the context has no action
    /// bus or the bus went away.
    pub fn take(&self, pattern: impl Into<Pattern>) -> impl Future<Output = Option<Action>> {
        let receiver = self.bus.as_ref().map(|bus| bus.subscribe(pattern.into()));
        async move {
            let mut receiver = receiver?;
            receiver.recv().await
        }
    }
}
