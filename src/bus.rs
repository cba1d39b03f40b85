use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::action::Action;

pub type EventSender<T> = mpsc::UnboundedSender<T>;
pub type EventReceiver<T> = mpsc::UnboundedReceiver<T>;

/// Which dispatched actions a subscriber wants to see.
#[derive(Clone)]
pub enum Pattern {
    Any,
    Kind(String),
    OneOf(Vec<String>),
    Predicate(Arc<dyn Fn(&Action) -> bool + Send + Sync>),
}

impl Pattern {
    /// Matches actions `f` accepts. `f` runs inside dispatch, after the
    /// state lock is released; it may read the store but must not dispatch.
    pub fn predicate(f: impl Fn(&Action) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, action: &Action) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(kind) => action.kind() == kind.as_str(),
            Self::OneOf(kinds) => kinds.iter().any(|kind| action.kind() == kind.as_str()),
            Self::Predicate(f) => f(action),
        }
    }
}

impl From<&str> for Pattern {
    fn from(kind: &str) -> Self {
        Self::Kind(kind.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(kind: String) -> Self {
        Self::Kind(kind)
    }
}

impl From<&String> for Pattern {
    fn from(kind: &String) -> Self {
        Self::Kind(kind.clone())
    }
}

impl From<Vec<String>> for Pattern {
    fn from(kinds: Vec<String>) -> Self {
        Self::OneOf(kinds)
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Kind(kind) => write!(f, "Kind({kind})"),
            Self::OneOf(kinds) => write!(f, "OneOf({})", kinds.join(", ")),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

#[derive(Clone)]
struct Subscriber {
    pattern: Pattern,
    sender: EventSender<Action>,
}

/// Fan-out of dispatched actions. Every live subscriber gets each matching
/// action exactly once, in dispatch order.
#[derive(Default)]
pub struct ActionBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, pattern: Pattern) -> EventReceiver<Action> {
        let (sender, receiver) = mpsc::unbounded_channel();
        log::trace!("New subscriber for {:?}", pattern);
        self.subscribers.lock().push(Subscriber { pattern, sender });
        receiver
    }

    /// Patterns are matched outside the subscriber lock, so a predicate may
    /// subscribe.
    pub fn publish(&self, action: &Action) {
        let subscribers = self.subscribers.lock().clone();
        let mut closed = false;
        for subscriber in &subscribers {
            if subscriber.sender.is_closed() || !subscriber.pattern.matches(action) {
                closed |= subscriber.sender.is_closed();
                continue;
            }
            closed |= subscriber.sender.send(action.clone()).is_err();
        }
        if closed {
            self.subscribers
                .lock()
                .retain(|subscriber| !subscriber.sender.is_closed());
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}
