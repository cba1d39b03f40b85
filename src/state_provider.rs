use std::sync::Arc;

use serde_json::Value;

pub type BorrowedState<'a, State> = lock_api::MappedRwLockReadGuard<'a, parking_lot::RawRwLock, State>;

/// Current-state accessor. Guards must not be held across a dispatch.
pub trait StateProvider: Send + Sync {
    type State;

    fn state(&self) -> BorrowedState<'_, Self::State>;
}

#[derive(Clone)]
pub struct AnyStateProvider {
    value: Arc<dyn StateProvider<State = Value>>,
}

impl AnyStateProvider {
    pub fn new(value: Arc<dyn StateProvider<State = Value>>) -> Self {
        Self { value }
    }
}

impl StateProvider for AnyStateProvider {
    type State = Value;

    fn state(&self) -> BorrowedState<'_, Self::State> {
        self.value.state()
    }
}
