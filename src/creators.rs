use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::action::{Action, Args, Deferred};
use crate::context::Context;
use crate::effect::Effect;
use crate::error::{Error, Result};
use crate::naming::screaming_snake;

pub type PlainFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
pub type EffectFn = Arc<dyn Fn(&[Value]) -> Effect + Send + Sync>;

/// How an action creator produces its action. Declared by the caller for
/// every registered name.
#[derive(Clone)]
pub enum Creator {
    /// Builds the action payload directly. A `"type"` string in the returned
    /// object overrides the generated type.
    Plain(PlainFn),
    /// Builds an effect; the action is wrapped so the coordinator performs it.
    Effect(EffectFn),
    /// Suspending operation run by the coordinator.
    Deferred(Arc<dyn Deferred>),
}

impl Creator {
    pub fn plain(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self::Plain(Arc::new(f))
    }

    pub fn effect(f: impl Fn(&[Value]) -> Effect + Send + Sync + 'static) -> Self {
        Self::Effect(Arc::new(f))
    }

    pub fn deferred(f: impl Deferred + 'static) -> Self {
        Self::Deferred(Arc::new(f))
    }
}

struct PerformEffect(EffectFn);

#[async_trait]
impl Deferred for PerformEffect {
    async fn invoke(&self, ctx: Context, args: Args) -> anyhow::Result<Option<Value>> {
        let effect = (self.0)(args.as_slice());
        ctx.perform(effect).await;
        Ok(None)
    }
}

/// Callable that turns arguments into an action of one fixed type.
#[derive(Clone)]
pub struct ActionCreator {
    kind: String,
    creator: Creator,
}

impl ActionCreator {
    pub fn new(kind: impl Into<String>, creator: Creator) -> Self {
        Self {
            kind: kind.into(),
            creator,
        }
    }

    /// Creator of wrapped actions for a single deferred function.
    pub fn deferred(kind: impl Into<String>, f: impl Deferred + 'static) -> Self {
        Self::new(kind, Creator::deferred(f))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Builds the action. Deferred and effect creators only capture `args`;
    /// their function runs later, inside the coordinator.
    pub fn create(&self, args: Args) -> Action {
        match &self.creator {
            Creator::Deferred(func) => Action::wrapped(self.kind.clone(), func.clone(), args),
            Creator::Effect(f) => {
                Action::wrapped(self.kind.clone(), Arc::new(PerformEffect(f.clone())), args)
            }
            Creator::Plain(f) => {
                let payload = f(args.as_slice());
                let kind = payload
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| self.kind.clone());
                Action::with_payload(kind, payload)
            }
        }
    }
}

/// Short name -> action creator.
#[derive(Clone, Default)]
pub struct Actions {
    creators: BTreeMap<String, ActionCreator>,
}

impl Actions {
    pub fn get(&self, name: &str) -> Option<&ActionCreator> {
        self.creators.get(name)
    }

    /// Shortcut for `get(name)?.create(args)`.
    pub fn create(&self, name: &str, args: Args) -> Option<Action> {
        self.get(name).map(|creator| creator.create(args))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

/// Short name and SCREAMING_SNAKE name -> fully qualified type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Types {
    kinds: BTreeMap<String, String>,
}

impl Types {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.kinds.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), kind.as_str()))
    }
}

impl Index<&str> for Types {
    type Output = String;

    fn index(&self, name: &str) -> &String {
        &self.kinds[name]
    }
}

pub struct ActionSet {
    pub actions: Actions,
    pub types: Types,
}

pub(crate) fn build<I, N>(
    prefix: &str,
    definitions: I,
    claimed: &mut BTreeSet<String>,
    reject_duplicates: bool,
) -> Result<ActionSet>
where
    I: IntoIterator<Item = (N, Creator)>,
    N: Into<String>,
{
    let mut actions = Actions::default();
    let mut types = Types::default();
    let mut batch = BTreeSet::new();

    for (name, creator) in definitions {
        let name = name.into();
        let Some(upper) = screaming_snake(&name) else {
            return Err(Error::InvalidActionName { name });
        };
        let kind = format!("{prefix}_{upper}");

        if claimed.contains(&kind) || !batch.insert(kind.clone()) {
            if reject_duplicates {
                return Err(Error::DuplicateType { name, kind });
            }
            log::warn!("Action {name} re-registers {kind}, keeping the latest creator");
        }

        actions
            .creators
            .insert(name.clone(), ActionCreator::new(kind.clone(), creator));
        types.kinds.insert(name, kind.clone());
        types.kinds.insert(upper, kind);
    }

    // Nothing is reserved unless the whole batch registered.
    claimed.extend(batch);
    Ok(ActionSet { actions, types })
}
