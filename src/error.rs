use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while registering slices and action creators, or while
/// wiring the store. Failures inside wrapped actions never surface here: the
/// coordinator turns them into `ERROR` actions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("slice key {key:?} does not contain any word characters")]
    InvalidSliceKey { key: String },

    #[error("action name {name:?} does not contain any word characters")]
    InvalidActionName { name: String },

    #[error("action {name:?} maps to type {kind} which is already registered in this slice")]
    DuplicateType { name: String, kind: String },

    #[error("completion coordinator is already running for this store")]
    CoordinatorRunning,
}
