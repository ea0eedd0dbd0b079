//! Observer registry - fan-out of collection events to registered observers

use std::sync::Arc;

use crate::events::{ManyArrayEvent, ManyArrayObserver};

pub struct ObserverRegistry {
    observers: Vec<Arc<dyn ManyArrayObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Arc<dyn ManyArrayObserver>) {
        self.observers.push(observer);
    }

    /// Drop a previously registered observer, matching by identity
    pub fn unregister(&mut self, observer: &Arc<dyn ManyArrayObserver>) -> bool {
        let before = self.observers.len();
        let target = Arc::as_ptr(observer) as *const ();
        self.observers
            .retain(|registered| !std::ptr::eq(Arc::as_ptr(registered) as *const (), target));
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Snapshot of the registered observers, for dispatch outside of any lock
    pub fn snapshot(&self) -> Vec<Arc<dyn ManyArrayObserver>> {
        self.observers.clone()
    }
}

/// Deliver `event` to each observer, specific callback first
pub fn dispatch(observers: &[Arc<dyn ManyArrayObserver>], association: &str, event: &ManyArrayEvent) {
    for observer in observers {
        match event {
            ManyArrayEvent::DidChange(change) => observer.array_did_change(association, change),
            ManyArrayEvent::DidLoad => observer.did_load(association),
        }
        observer.on_event(association, event);
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
