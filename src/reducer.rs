use serde_json::{Map, Value};

use crate::action::Action;

pub trait Reducer: Send + Sync {
    fn reduce(&self, state: &mut Value, action: &Action);
}

impl<F> Reducer for F
where
    F: Fn(&mut Value, &Action) + Send + Sync,
{
    fn reduce(&self, state: &mut Value, action: &Action) {
        self(state, action)
    }
}

/// Leaves state alone except for filling an undefined (`null`) state with
/// the given default.
#[derive(Debug, Clone)]
pub struct Initial(pub Value);

impl Reducer for Initial {
    fn reduce(&self, state: &mut Value, _action: &Action) {
        if state.is_null() {
            *state = self.0.clone();
        }
    }
}

/// Mounts reducers at keys of the top-level state object. Each reducer only
/// ever sees its own key.
#[derive(Default)]
pub struct Combine {
    reducers: Vec<(String, Box<dyn Reducer>)>,
}

impl Combine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(mut self, key: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        self.reducers.push((key.into(), Box::new(reducer)));
        self
    }
}

impl Reducer for Combine {
    fn reduce(&self, state: &mut Value, action: &Action) {
        if !state.is_object() {
            *state = Value::Object(Map::new());
        }
        if let Value::Object(tree) = state {
            for (key, reducer) in &self.reducers {
                let slot = tree.entry(key.clone()).or_insert(Value::Null);
                reducer.reduce(slot, action);
            }
        }
    }
}

/// `{...target, ...patch}`. Anything that is not an object counts as `{}`.
pub(crate) fn merge(target: &mut Value, patch: &Map<String, Value>) {
    match target {
        Value::Object(map) => map.extend(patch.clone()),
        other => *other = Value::Object(patch.clone()),
    }
}
