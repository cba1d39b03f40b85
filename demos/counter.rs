//! Counter slice driven from the terminal.
//!
//! Run with `RUST_LOG=debug` to watch actions flow through the store.

use std::time::Duration;

use serde_json::{json, Value};
use smd::{completed, error, Args, Combine, Context, Creator, Drive, Store, Update};

fn step(delta: i64) -> Update {
    Update::with(move |state, _| {
        let value = state["value"].as_i64()?;
        Some(json!({"value": value + delta, "loading": false}))
    })
}

fn delayed(counter: &Drive, delta: i64) -> Creator {
    let counter = counter.clone();
    Creator::deferred(move |ctx: Context, args: Args| {
        let counter = counter.clone();
        async move {
            ctx.perform(counter.set_state(json!({"loading": true}), None)).await;
            let delay = args.first().and_then(Value::as_u64).unwrap_or(1000);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            ctx.perform(counter.set_state(step(delta), None)).await;
            Ok::<Option<Value>, anyhow::Error>(None)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let initial = json!({"value": 0, "loading": false});
    let counter = Drive::new("counter", initial.clone())?;
    let store = Store::new(
        json!({}),
        Combine::new().mount(counter.key(), counter.reducer()),
    );
    let _coordinator = store.start_coordinator()?;

    let set = counter.create_actions([
        ("reset", {
            let counter = counter.clone();
            Creator::effect(move |_| counter.reset_state(initial.clone(), None))
        }),
        ("increment", {
            let counter = counter.clone();
            Creator::effect(move |_| counter.set_state(step(1), None))
        }),
        ("decrement", {
            let counter = counter.clone();
            Creator::effect(move |_| counter.set_state(step(-1), None))
        }),
        ("incrementAsync", delayed(&counter, 1)),
        ("decrementAsync", delayed(&counter, -1)),
    ])?;

    let script = [
        ("increment", vec![]),
        ("increment", vec![]),
        ("decrement", vec![]),
        ("incrementAsync", vec![json!(200)]),
        ("decrementAsync", vec![json!(100)]),
        ("reset", vec![]),
    ];

    for (name, args) in script {
        let Some(action) = set.actions.create(name, args) else {
            continue;
        };
        let finished = store.take(vec![completed(&action), error(&action)]);
        store.dispatch(action);
        if let Some(done) = finished.await {
            println!("{:<36} -> {}", done.kind(), store.state()["counter"]);
        }
    }

    Ok(())
}
