use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::action::{Action, Body};
use crate::context::Context;

/// Runs one wrapped action to the end and reports how it went.
///
/// Exactly one `COMPLETED` or `ERROR` action is put per call. Errors and
/// panics of the wrapped function never leave this function.
pub(crate) async fn handle_action(ctx: Context, action: Action) {
    let Body::Wrapped(call) = action.body() else {
        return;
    };

    let invocation = call.func.invoke(ctx.clone(), call.args.clone());
    let outcome = match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(anyhow::anyhow!(
            "wrapped action panicked: {}",
            panic_message(&*panic)
        )),
    };

    match outcome {
        Ok(result) => {
            log::debug!("{} completed", action.kind());
            ctx.put(Action::completed(&action, result));
        }
        Err(error) => {
            log::warn!("{} failed: {:#}", action.kind(), error);
            ctx.put(Action::failed(&action, error));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
