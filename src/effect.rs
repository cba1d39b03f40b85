use std::fmt::Debug;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::action::Action;
use crate::context::Context;

/// Description of work to perform against a [`Context`]. Nothing happens
/// until it is passed to [`Context::perform`].
pub struct Effect {
    pub value: EffectValue,
}

pub type AsyncJob = Box<dyn FnOnce(Context) -> BoxFuture<'static, ()> + Send>;

pub enum EffectValue {
    None,
    Send(Action),
    Async(AsyncJob),
}

impl Effect {
    pub fn run<T, Fut>(job: T) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
        T: FnOnce(Context) -> Fut + Send + 'static,
    {
        let boxed_job: AsyncJob = Box::new(move |ctx: Context| job(ctx).boxed());
        Self {
            value: EffectValue::Async(boxed_job),
        }
    }

    pub fn none() -> Self {
        Self {
            value: EffectValue::None,
        }
    }

    pub fn send(action: Action) -> Self {
        Self {
            value: EffectValue::Send(action),
        }
    }
}

impl Debug for EffectValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Send(action) => write!(f, "Send {action:#?}"),
            Self::Async(_) => f.write_str("Async"),
        }
    }
}
