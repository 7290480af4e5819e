//! Subscriber fan-out.
//!
//! Delivery is synchronous, exactly once per emission, to every subscriber
//! registered at the time of the broadcast. A subscriber whose delivery fails
//! is removed at once; the others still receive the event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::DomainEvent;
use crate::error::DeliveryError;
use crate::port::Subscriber;

/// Handle returned by [`SubscriberSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Entry = (SubscriberId, Arc<dyn Subscriber>);

/// The dynamic set of subscribers.
#[derive(Default)]
pub struct SubscriberSet {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Entry>>,
}

impl SubscriberSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscriber = subscriber.name(), id = id.0, "Subscriber added");
        self.subscribers.lock().push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Subscribe a bounded channel and return its receiving end.
    ///
    /// A full channel counts as a failed delivery, so a consumer that falls
    /// `capacity` events behind is dropped rather than stalling the channel.
    pub fn channel(&self, capacity: usize) -> (SubscriberId, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.subscribe(Arc::new(ChannelSubscriber { tx }));
        (id, rx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Deliver `event` to every subscriber. Returns the number of successful
    /// deliveries.
    pub fn broadcast(&self, event: &DomainEvent) -> usize {
        let current: Vec<Entry> = self.subscribers.lock().clone();

        let mut failed = Vec::new();
        let mut delivered = 0;
        for (id, subscriber) in &current {
            match subscriber.deliver(event) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(
                        subscriber = subscriber.name(),
                        event = event.kind(),
                        error = %err,
                        "Delivery failed, removing subscriber"
                    );
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            self.subscribers
                .lock()
                .retain(|(id, _)| !failed.contains(id));
        }
        delivered
    }
}

struct ChannelSubscriber {
    tx: mpsc::Sender<DomainEvent>,
}

impl Subscriber for ChannelSubscriber {
    fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Lagging,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn name(&self) -> &str {
        "channel"
    }
}
