//! Declarative state updates for a single-store state container.
//!
//! A [`Drive`] names a slice of the state tree. It generates namespaced
//! action types for the creators registered on it, produces `set_state` /
//! `reset_state` effects, and wraps a base reducer so those effects land in
//! the state. Deferred creators produce wrapped actions which the store's
//! completion coordinator runs, following each with a
//! [`completed()`] or [`error()`] action.

mod action;
mod action_sender;
mod bus;
mod change_observer;
mod config;
mod context;
mod coordinator;
mod creators;
mod drive;
mod effect;
mod engine;
mod error;
mod naming;
mod reducer;
mod state_mapper;
mod state_provider;
mod store;

pub use action::{Action, Args, Body, Deferred, DeferredCall};
pub use action_sender::{ActionSender, AnyActionSender};
pub use bus::Pattern;
pub use change_observer::ChangeObserver;
pub use config::{Config, Mount};
pub use context::Context;
pub use creators::{ActionCreator, ActionSet, Actions, Creator, Types};
pub use drive::{Drive, DriveReducer, ReservedTypes, Update};
pub use effect::{Effect, EffectValue};
pub use error::{Error, Result};
pub use naming::{completed, error, screaming_snake, ActionKind};
pub use reducer::{Combine, Initial, Reducer};
pub use state_provider::{BorrowedState, StateProvider};
pub use store::{Store, Watcher};
