//! Recording and failing [`Subscriber`]s.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::domain::DomainEvent;
use crate::error::DeliveryError;
use crate::port::Subscriber;

/// Records every delivered event.
#[derive(Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Recorded events of one kind (`price_update` or `market_resolved`).
    pub fn events_of(&self, kind: &str) -> Vec<DomainEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }
}

impl Subscriber for RecordingSubscriber {
    fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Fails every delivery with the given error.
pub struct FailingSubscriber {
    error: DeliveryError,
    attempts: AtomicU32,
}

impl FailingSubscriber {
    pub fn new(error: DeliveryError) -> Self {
        Self {
            error,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Subscriber for FailingSubscriber {
    fn deliver(&self, _event: &DomainEvent) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "failing"
    }
}
