//! A state slice together with its reserved action types, the effects that
//! produce them and the reducer that applies them.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::action::{Action, Body};
use crate::config::{Config, Mount};
use crate::creators::{self, ActionSet, Creator};
use crate::effect::Effect;
use crate::error::{Error, Result};
use crate::naming::{self, screaming_snake};
use crate::reducer::{merge, Initial, Reducer};

/// Reserved action types of one slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedTypes {
    pub set_state: String,
    pub reset_state: String,
    pub reduce: String,
}

type UpdateFn = Arc<dyn Fn(&Value, &Value) -> Option<Value> + Send + Sync>;

/// Argument of [`Drive::set_state`].
#[derive(Clone)]
pub enum Update {
    /// Merged as is.
    Patch(Map<String, Value>),
    /// Called with the targeted state and the whole tree. `None`, `null` or
    /// an empty object means nothing to update.
    With(UpdateFn),
}

impl Update {
    pub fn with(f: impl Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self::With(Arc::new(f))
    }

    fn resolve(&self, state: &Value, global: &Value) -> Option<Map<String, Value>> {
        let patch = match self {
            Self::Patch(patch) => patch.clone(),
            Self::With(f) => match f(state, global)? {
                Value::Object(patch) => patch,
                Value::Null => return None,
                other => {
                    log::warn!("Ignoring non-object state patch {other}");
                    return None;
                }
            },
        };
        (!patch.is_empty()).then_some(patch)
    }
}

impl From<Map<String, Value>> for Update {
    fn from(patch: Map<String, Value>) -> Self {
        Self::Patch(patch)
    }
}

/// Objects become patches; anything else is an empty patch.
impl From<Value> for Update {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(patch) => Self::Patch(patch),
            Value::Null => Self::Patch(Map::new()),
            other => {
                log::warn!("Ignoring non-object state patch {other}");
                Self::Patch(Map::new())
            }
        }
    }
}

struct DriveInner {
    key: String,
    prefix: String,
    initial: Value,
    config: Config,
    types: ReservedTypes,
    claimed: Mutex<BTreeSet<String>>,
}

/// Handle on one state slice. Cheap to clone, so action creators can capture
/// it to build `set_state`/`reset_state` effects.
#[derive(Clone)]
pub struct Drive {
    inner: Arc<DriveInner>,
}

impl Drive {
    pub fn new(key: impl Into<String>, initial: Value) -> Result<Self> {
        Self::with_config(key, initial, Config::default())
    }

    pub fn with_config(key: impl Into<String>, initial: Value, config: Config) -> Result<Self> {
        let key = key.into();
        let Some(prefix) = screaming_snake(&key) else {
            return Err(Error::InvalidSliceKey { key });
        };
        let types = ReservedTypes {
            set_state: naming::reserved(&prefix, "SET_STATE"),
            reset_state: naming::reserved(&prefix, "RESET_STATE"),
            reduce: naming::reserved(&prefix, "REDUCE"),
        };
        log::debug!("Registered slice {key} with prefix {prefix}");
        Ok(Self {
            inner: Arc::new(DriveInner {
                key,
                prefix,
                initial,
                config,
                types,
                claimed: Mutex::new(BTreeSet::new()),
            }),
        })
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// SCREAMING_SNAKE form of the key; prefix of every type in the slice.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn types(&self) -> &ReservedTypes {
        &self.inner.types
    }

    /// Reducer for this slice with no behaviour of its own beyond the
    /// initial state.
    pub fn reducer(&self) -> DriveReducer<Initial> {
        self.wrap_reducer(Initial(self.inner.initial.clone()))
    }

    /// Wraps `base` so the slice's reserved actions are interpreted before
    /// anything reaches it.
    pub fn wrap_reducer<R: Reducer>(&self, base: R) -> DriveReducer<R> {
        DriveReducer {
            types: self.inner.types.clone(),
            initial: self.inner.initial.clone(),
            base,
        }
    }

    /// Registers action creators under this slice's namespace.
    ///
    /// Every name gets the type `<PREFIX>_<NAME_IN_SCREAMING_SNAKE>`, exposed
    /// in [`crate::Types`] under the short name and the SCREAMING_SNAKE name.
    pub fn create_actions<I, N>(&self, definitions: I) -> Result<ActionSet>
    where
        I: IntoIterator<Item = (N, Creator)>,
        N: Into<String>,
    {
        let mut claimed = self.inner.claimed.lock();
        creators::build(
            &self.inner.prefix,
            definitions,
            &mut claimed,
            self.inner.config.reject_duplicate_types,
        )
    }

    /// Reads the current state and dispatches a patch for it.
    ///
    /// The update sees the slice state (narrowed further to `root` when
    /// given) and the whole tree. Nothing is dispatched for an empty patch.
    pub fn set_state(&self, update: impl Into<Update>, root: Option<&str>) -> Effect {
        let update = update.into();
        let kind = self.inner.types.set_state.clone();
        let mount = self.mount_key();
        let root = root.map(str::to_owned);

        Effect::run(move |ctx| async move {
            let global = ctx.select();
            let mounted = match &mount {
                Some(key) => &global[key.as_str()],
                None => &global,
            };
            let state = match &root {
                Some(root) => &mounted[root.as_str()],
                None => mounted,
            };
            let Some(patch) = update.resolve(state, &global) else {
                log::trace!("Nothing to patch for {kind}");
                return;
            };
            ctx.put(Action::set_state(kind, root, patch));
        })
    }

    /// Replaces the slice state (or its `root` member) with `new_state`.
    pub fn reset_state(&self, new_state: Value, root: Option<&str>) -> Effect {
        let new_state = match new_state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                log::warn!("Resetting to non-object state {other}, using an empty object");
                Map::new()
            }
        };
        Effect::send(Action::reset_state(
            self.inner.types.reset_state.clone(),
            root.map(str::to_owned),
            new_state,
        ))
    }

    /// Applies `reduce` to the slice state inside the reducer.
    pub fn reduce_state(&self, reduce: impl Fn(&mut Value) + Send + Sync + 'static) -> Effect {
        Effect::send(Action::reduce(
            self.inner.types.reduce.clone(),
            Arc::new(reduce),
        ))
    }

    fn mount_key(&self) -> Option<String> {
        match self.inner.config.mount {
            Mount::Slice => Some(self.inner.key.clone()),
            Mount::Root => None,
        }
    }
}

/// Reducer interpreting a slice's reserved actions and delegating the rest.
pub struct DriveReducer<R> {
    types: ReservedTypes,
    initial: Value,
    base: R,
}

impl<R: Reducer> Reducer for DriveReducer<R> {
    fn reduce(&self, state: &mut Value, action: &Action) {
        if state.is_null() {
            *state = self.initial.clone();
        }

        let kind = action.kind();
        match action.body() {
            Body::SetState { root, patch } if kind == self.types.set_state => match root {
                Some(root) => merge(member(state, root), patch),
                None => merge(state, patch),
            },
            Body::ResetState { root, new_state } if kind == self.types.reset_state => {
                let replacement = Value::Object(new_state.clone());
                match root {
                    Some(root) => *member(state, root) = replacement,
                    None => *state = replacement,
                }
            }
            Body::Reduce(reduce) if kind == self.types.reduce => reduce(state),
            _ => self.base.reduce(state, action),
        }
    }
}

/// `&mut state[key]`, turning `state` into an object first if needed.
fn member<'a>(state: &'a mut Value, key: &str) -> &'a mut Value {
    if !state.is_object() {
        *state = Value::Object(Map::new());
    }
    &mut state[key]
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn drive() -> Drive {
        Drive::new("counter", json!({"value": 0})).unwrap()
    }

    fn set_state(drive: &Drive, root: Option<&str>, patch: Value) -> Action {
        Action::set_state(
            drive.types().set_state.clone(),
            root.map(str::to_owned),
            patch.as_object().unwrap().clone(),
        )
    }

    fn reset_state(drive: &Drive, root: Option<&str>, new_state: Value) -> Action {
        Action::reset_state(
            drive.types().reset_state.clone(),
            root.map(str::to_owned),
            new_state.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn test_reserved_types() {
        let drive = Drive::new("todoList", Value::Null).unwrap();
        assert_eq!(drive.prefix(), "TODO_LIST");
        assert_eq!(drive.types().set_state, "TODO_LIST@SMD/SET_STATE");
        assert_eq!(drive.types().reset_state, "TODO_LIST@SMD/RESET_STATE");
        assert_eq!(drive.types().reduce, "TODO_LIST@SMD/REDUCE");
    }

    #[test]
    fn test_invalid_key() {
        assert_eq!(
            Drive::new(" ", Value::Null).err(),
            Some(Error::InvalidSliceKey { key: " ".into() })
        );
    }

    #[test]
    fn test_set_state_merges() {
        let drive = drive();
        let reducer = drive.reducer();

        let mut state = json!({"a": 1, "nested": {"x": 1, "y": 2}});
        reducer.reduce(&mut state, &set_state(&drive, None, json!({"a": 2, "b": 3})));
        assert_eq!(state, json!({"a": 2, "b": 3, "nested": {"x": 1, "y": 2}}));

        reducer.reduce(&mut state, &set_state(&drive, Some("nested"), json!({"y": 5})));
        assert_eq!(state, json!({"a": 2, "b": 3, "nested": {"x": 1, "y": 5}}));

        reducer.reduce(&mut state, &set_state(&drive, Some("fresh"), json!({"z": 0})));
        assert_eq!(state["fresh"], json!({"z": 0}));
    }

    #[test]
    fn test_reset_state_replaces() {
        let drive = drive();
        let reducer = drive.reducer();

        let mut state = json!({"a": {"old": true}, "b": 1});
        let replace_a = reset_state(&drive, Some("a"), json!({"new": true}));
        reducer.reduce(&mut state, &replace_a);
        assert_eq!(state, json!({"a": {"new": true}, "b": 1}));

        reducer.reduce(&mut state, &replace_a);
        assert_eq!(state, json!({"a": {"new": true}, "b": 1}));

        reducer.reduce(&mut state, &reset_state(&drive, None, json!({"value": 9})));
        assert_eq!(state, json!({"value": 9}));
    }

    #[test]
    fn test_other_slices_fall_through() {
        let counter = drive();
        let other = Drive::new("other", json!({})).unwrap();
        let reducer = counter.reducer();

        let mut state = json!({"value": 1});
        reducer.reduce(&mut state, &set_state(&other, None, json!({"value": 100})));
        reducer.reduce(&mut state, &Action::new("NOOP"));
        assert_eq!(state, json!({"value": 1}));
    }

    #[test]
    fn test_wrapped_base_reducer_and_initial_state() {
        let drive = drive();
        let reducer = drive.wrap_reducer(|state: &mut Value, action: &Action| {
            if action.kind() == "DOUBLE" {
                let value = state["value"].as_i64().unwrap_or_default();
                state["value"] = json!(value * 2);
            }
        });

        let mut state = Value::Null;
        reducer.reduce(&mut state, &Action::new("NOOP"));
        assert_eq!(state, json!({"value": 0}));

        state["value"] = json!(4);
        reducer.reduce(&mut state, &Action::new("DOUBLE"));
        assert_eq!(state, json!({"value": 8}));
    }

    #[test]
    fn test_reduce_state() {
        let drive = drive();
        let reducer = drive.reducer();
        let effect = drive.reduce_state(|state| state["value"] = json!(42));
        let crate::effect::EffectValue::Send(action) = effect.value else {
            panic!("reduce_state must send an action");
        };

        let mut state = json!({"value": 0});
        reducer.reduce(&mut state, &action);
        assert_eq!(state, json!({"value": 42}));
    }

    mod counter {
        use std::time::Duration;

        use super::*;
        use crate::action::Args;
        use crate::context::Context;
        use crate::naming::completed;
        use crate::reducer::Combine;
        use crate::store::Store;

        fn increment(counter: &Drive) -> Creator {
            let counter = counter.clone();
            Creator::deferred(move |ctx: Context, _args: Args| {
                let effect = counter.set_state(
                    Update::with(|state, _| {
                        let value = state["value"].as_i64()?;
                        Some(json!({"value": value + 1}))
                    }),
                    None,
                );
                async move {
                    ctx.perform(effect).await;
                    Ok::<Option<Value>, anyhow::Error>(None)
                }
            })
        }

        fn increment_async(counter: &Drive) -> Creator {
            let counter = counter.clone();
            Creator::deferred(move |ctx: Context, args: Args| {
                let counter = counter.clone();
                async move {
                    ctx.perform(counter.set_state(json!({"loading": true}), None)).await;
                    let delay = args.first().and_then(Value::as_u64).unwrap_or_default();
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    let bump = Update::with(|state, _| {
                        let value = state["value"].as_i64()?;
                        Some(json!({"value": value + 1, "loading": false}))
                    });
                    ctx.perform(counter.set_state(bump, None)).await;
                    Ok::<_, anyhow::Error>(Some(json!(delay)))
                }
            })
        }

        fn setup() -> (Store, Drive, ActionSet) {
            let counter = Drive::new("counter", json!({"value": 0, "loading": false})).unwrap();
            let reducer = Combine::new().mount(counter.key(), counter.reducer());
            let store = Store::new(json!({}), reducer);
            let set = counter
                .create_actions([
                    ("increment", increment(&counter)),
                    ("incrementAsync", increment_async(&counter)),
                    (
                        "reset",
                        Creator::effect({
                            let counter = counter.clone();
                            move |_| counter.reset_state(json!({"value": 0, "loading": false}), None)
                        }),
                    ),
                    (
                        "noop",
                        Creator::effect({
                            let counter = counter.clone();
                            move |_| counter.set_state(Update::with(|_, _| None), None)
                        }),
                    ),
                ])
                .unwrap();
            (store, counter, set)
        }

        async fn run(store: &Store, action: Action) -> Action {
            let done = store.take(completed(&action));
            store.dispatch(action);
            tokio::time::timeout(Duration::from_secs(2), done)
                .await
                .unwrap()
                .unwrap()
        }

        #[tokio::test]
        async fn test_increment_twice() {
            let (store, _counter, set) = setup();
            let _coordinator = store.start_coordinator().unwrap();
            assert_eq!(store.snapshot(), json!({"counter": {"value": 0, "loading": false}}));

            run(&store, set.actions.create("increment", vec![]).unwrap()).await;
            assert_eq!(store.state()["counter"]["value"], 1);

            run(&store, set.actions.create("increment", vec![]).unwrap()).await;
            assert_eq!(store.state()["counter"]["value"], 2);
        }

        #[tokio::test]
        async fn test_async_increment_and_reset() {
            let (store, _counter, set) = setup();
            let _coordinator = store.start_coordinator().unwrap();

            let action = set.actions.create("incrementAsync", vec![json!(20)]).unwrap();
            let done = run(&store, action).await;
            assert_eq!(done.kind(), "COUNTER_INCREMENT_ASYNC@SMD/COMPLETED");
            assert_eq!(done.result(), Some(&json!(20)));
            assert_eq!(store.snapshot(), json!({"counter": {"value": 1, "loading": false}}));

            run(&store, set.actions.create("reset", vec![]).unwrap()).await;
            assert_eq!(store.snapshot(), json!({"counter": {"value": 0, "loading": false}}));
        }

        #[tokio::test]
        async fn test_empty_update_dispatches_nothing() {
            let (store, counter, set) = setup();
            let _coordinator = store.start_coordinator().unwrap();
            let patches = store.take(counter.types().set_state.clone());
            let before = store.snapshot();

            run(&store, set.actions.create("noop", vec![]).unwrap()).await;

            assert_eq!(store.snapshot(), before);
            assert!(
                tokio::time::timeout(Duration::from_millis(20), patches)
                    .await
                    .is_err()
            );
        }

        #[tokio::test]
        async fn test_root_mount_narrows_to_member() {
            let config = Config {
                mount: Mount::Root,
                ..Config::default()
            };
            let app = Drive::with_config("app", json!({}), config).unwrap();
            let store = Store::new(json!({"a": {"n": 1}, "b": 2}), app.reducer());
            let ctx = store.context();

            let bump = Update::with(|state, global| {
                let n = state["n"].as_i64()? + global["b"].as_i64()?;
                Some(json!({"n": n}))
            });
            ctx.perform(app.set_state(bump, Some("a"))).await;
            assert_eq!(store.snapshot(), json!({"a": {"n": 3}, "b": 2}));

            ctx.perform(app.reset_state(json!({"x": 1}), Some("b"))).await;
            assert_eq!(store.snapshot(), json!({"a": {"n": 3}, "b": {"x": 1}}));
        }

        #[tokio::test]
        async fn test_types() {
            let (_store, counter, set) = setup();
            assert_eq!(set.types["incrementAsync"], "COUNTER_INCREMENT_ASYNC");
            assert_eq!(set.types["INCREMENT_ASYNC"], "COUNTER_INCREMENT_ASYNC");
            assert_eq!(
                counter.create_actions([("increment", Creator::plain(|_| Value::Null))]).err(),
                Some(Error::DuplicateType {
                    name: "increment".into(),
                    kind: "COUNTER_INCREMENT".into()
                })
            );
        }
    }

    #[test]
    fn test_failed_registration_can_be_retried() {
        let drive = Drive::new("counter", json!({"value": 0})).unwrap();
        let err = drive
            .create_actions([
                ("increment", Creator::plain(|_| Value::Null)),
                ("--", Creator::plain(|_| Value::Null)),
            ])
            .err();
        assert_eq!(err, Some(Error::InvalidActionName { name: "--".into() }));

        let set = drive
            .create_actions([("increment", Creator::plain(|_| Value::Null))])
            .unwrap();
        assert_eq!(set.types["increment"], "COUNTER_INCREMENT");
    }

    #[test]
    fn test_update_resolution() {
        let global = json!({"counter": {"value": 1}});
        let state = &global["counter"];

        let update = Update::with(|state, _| {
            let value = state["value"].as_i64()?;
            Some(json!({"value": value + 1}))
        });
        let expected = json!({"value": 2}).as_object().cloned();
        assert_eq!(update.resolve(state, &global), expected);

        assert!(Update::with(|_, _| None).resolve(state, &global).is_none());
        assert!(Update::with(|_, _| Some(Value::Null)).resolve(state, &global).is_none());
        assert!(Update::with(|_, _| Some(json!({}))).resolve(state, &global).is_none());
        assert!(Update::from(json!(3)).resolve(state, &global).is_none());
        assert!(Update::from(json!({"a": 1})).resolve(state, &global).is_some());
    }
}
