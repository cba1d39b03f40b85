use std::sync::Arc;

use crate::action::Action;

/// Dispatch sink.
pub trait ActionSender: Send + Sync {
    fn send(&self, action: Action);
}

#[derive(Clone)]
pub struct AnyActionSender {
    value: Arc<dyn ActionSender>,
}

impl AnyActionSender {
    pub fn new(value: Arc<dyn ActionSender>) -> Self {
        Self { value }
    }
}

impl ActionSender for AnyActionSender {
    fn send(&self, action: Action) {
        self.value.send(action)
    }
}

impl<T> ActionSender for Arc<T>
where
    T: ActionSender + ?Sized,
{
    fn send(&self, action: Action) {
        (**self).send(action);
    }
}
