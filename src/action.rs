use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::naming;

/// Positional arguments captured by a wrapped action.
pub type Args = Vec<Value>;

pub type ReduceFn = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// A suspending operation invoked by the completion coordinator.
///
/// Implemented for every `Fn(Context, Args) -> impl Future`, so plain async
/// closures can be registered directly.
#[async_trait]
pub trait Deferred: Send + Sync {
    async fn invoke(&self, ctx: Context, args: Args) -> anyhow::Result<Option<Value>>;
}

#[async_trait]
impl<F, Fut> Deferred for F
where
    F: Fn(Context, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
{
    async fn invoke(&self, ctx: Context, args: Args) -> anyhow::Result<Option<Value>> {
        (self)(ctx, args).await
    }
}

/// Function reference plus the arguments it was called with. Nothing runs
/// until the coordinator picks the action up.
#[derive(Clone)]
pub struct DeferredCall {
    pub func: Arc<dyn Deferred>,
    pub args: Args,
}

#[derive(Clone)]
pub enum Body {
    Plain(Value),
    Wrapped(DeferredCall),
    SetState {
        root: Option<String>,
        patch: Map<String, Value>,
    },
    ResetState {
        root: Option<String>,
        new_state: Map<String, Value>,
    },
    Reduce(ReduceFn),
    Completed {
        result: Option<Value>,
    },
    Failed {
        error: Arc<anyhow::Error>,
    },
    Init,
}

/// A dispatchable unit. Immutable once built; clones share function
/// references.
#[derive(Clone)]
pub struct Action {
    kind: String,
    body: Body,
}

impl Action {
    /// Action with the given type and no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_payload(kind, Value::Null)
    }

    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            body: Body::Plain(payload),
        }
    }

    pub fn wrapped(kind: impl Into<String>, func: Arc<dyn Deferred>, args: Args) -> Self {
        Self {
            kind: kind.into(),
            body: Body::Wrapped(DeferredCall { func, args }),
        }
    }

    pub(crate) fn set_state(
        kind: String,
        root: Option<String>,
        patch: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            body: Body::SetState { root, patch },
        }
    }

    pub(crate) fn reset_state(
        kind: String,
        root: Option<String>,
        new_state: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            body: Body::ResetState { root, new_state },
        }
    }

    pub(crate) fn reduce(kind: String, reduce: ReduceFn) -> Self {
        Self {
            kind,
            body: Body::Reduce(reduce),
        }
    }

    /// `<type>@SMD/COMPLETED`. A `null` result is dropped.
    pub fn completed(source: &Action, result: Option<Value>) -> Self {
        Self {
            kind: naming::completed(source),
            body: Body::Completed {
                result: result.filter(|value| !value.is_null()),
            },
        }
    }

    /// `<type>@SMD/ERROR` carrying the original error.
    pub fn failed(source: &Action, error: anyhow::Error) -> Self {
        Self {
            kind: naming::error(source),
            body: Body::Failed {
                error: Arc::new(error),
            },
        }
    }

    pub(crate) fn init() -> Self {
        Self {
            kind: naming::INIT.to_owned(),
            body: Body::Init,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self.body, Body::Wrapped(_))
    }

    /// Payload of a plain action.
    pub fn payload(&self) -> Option<&Value> {
        match &self.body {
            Body::Plain(value) => Some(value),
            _ => None,
        }
    }

    /// Result carried by a `COMPLETED` action, if the function produced one.
    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            Body::Completed { result } => result.as_ref(),
            _ => None,
        }
    }

    /// Error carried by an `ERROR` action.
    pub fn error(&self) -> Option<&anyhow::Error> {
        match &self.body {
            Body::Failed { error } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("Action");
        out.field("type", &self.kind);
        match &self.body {
            Body::Plain(Value::Null) | Body::Init => {}
            Body::Plain(payload) => {
                out.field("payload", payload);
            }
            Body::Wrapped(call) => {
                out.field("wrapped", &true).field("args", &call.args);
            }
            Body::SetState { root, patch } => {
                out.field("root", root).field("patch", patch);
            }
            Body::ResetState { root, new_state } => {
                out.field("root", root).field("new_state", new_state);
            }
            Body::Reduce(_) => {
                out.field("reduce", &"<fn>");
            }
            Body::Completed { result } => {
                out.field("result", result);
            }
            Body::Failed { error } => {
                out.field("error", &format_args!("{error:#}"));
            }
        }
        out.finish()
    }
}
