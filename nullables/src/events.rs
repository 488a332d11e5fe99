//! Event capture for assertions.

use cinder_types::{ContractEvent, EventBus};
use std::sync::{Arc, Mutex, PoisonError};

/// Records every event emitted on the buses it is attached to.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ContractEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder and subscribe it to `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let recorder = Self::new();
        recorder.subscribe_to(bus);
        recorder
    }

    /// Subscribe this recorder to one more bus.
    pub fn subscribe_to(&self, bus: &EventBus) {
        let events = Arc::clone(&self.events);
        bus.subscribe(move |event| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
    }

    /// Snapshot of everything recorded so far, in emission order.
    pub fn events(&self) -> Vec<ContractEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
