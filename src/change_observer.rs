use tokio::sync::broadcast;

/// Notified after every dispatch that changed the state tree.
pub trait ChangeObserver {
    fn observe(&self) -> broadcast::Receiver<()>;
}
