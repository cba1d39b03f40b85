use serde_json::Value;

use crate::state_provider::{AnyStateProvider, BorrowedState, StateProvider};

/// Read-only view of one part of the state tree.
pub struct StateMapper<F>
where
    F: Fn(&Value) -> &Value + Clone + Send + Sync + 'static,
{
    parent: AnyStateProvider,
    map: F,
}

impl<F> StateMapper<F>
where
    F: Fn(&Value) -> &Value + Clone + Send + Sync + 'static,
{
    pub fn new(parent: AnyStateProvider, map: F) -> Self {
        Self { parent, map }
    }
}

impl<F> StateProvider for StateMapper<F>
where
    F: Fn(&Value) -> &Value + Clone + Send + Sync + 'static,
{
    type State = Value;

    fn state(&self) -> BorrowedState<'_, Self::State> {
        BorrowedState::map(self.parent.state(), self.map.clone())
    }
}
