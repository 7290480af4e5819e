//! Subscriber port for domain events.

use tracing::info;

use crate::domain::DomainEvent;
use crate::error::DeliveryError;

/// Receives domain events from the streaming channel.
///
/// Delivery is synchronous and must not block: hand slow work off to a task
/// or a channel. Returning an error removes the subscriber from the fan-out
/// set.
pub trait Subscriber: Send + Sync {
    fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// A logging subscriber that records events via tracing.
pub struct LogSubscriber;

impl Subscriber for LogSubscriber {
    fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        match event {
            DomainEvent::PriceUpdate {
                market_id,
                outcome_label,
                price,
                ..
            } => {
                info!(market_id = %market_id, outcome = %outcome_label, price = %price, "Price update");
            }
            DomainEvent::MarketResolved {
                market_id,
                event_id,
                winning_outcome,
                ..
            } => {
                info!(
                    market_id = %market_id,
                    event_id = %event_id,
                    winner = winning_outcome.as_deref().unwrap_or("unknown"),
                    "Market resolved"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
