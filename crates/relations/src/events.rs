//! Collection events and the observer trait receiving them

use crate::collection::ArrayChange;

/// Notifications emitted by a relationship collection
#[derive(Debug, Clone, PartialEq)]
pub enum ManyArrayEvent {
    /// A positional replacement has been applied
    DidChange(ArrayChange),
    /// Every expected member finished loading
    DidLoad,
}

/// Observer of a single relationship collection
///
/// Callbacks run synchronously once the change is applied and the collection
/// released its internal locks, so observers may read the collection they
/// observe.
pub trait ManyArrayObserver: Send + Sync {
    fn array_did_change(&self, _association: &str, _change: &ArrayChange) {}

    fn did_load(&self, _association: &str) {}

    /// Catch-all hook invoked for every event after the specific callback
    fn on_event(&self, _association: &str, _event: &ManyArrayEvent) {}
}
