//! Domain events fanned out to subscribers.

use rust_decimal::Decimal;
use serde::Serialize;

use super::id::{EventId, MarketId, PositionId};
use super::market::{PriceChange, Resolution};

/// Events emitted by the streaming channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    PriceUpdate {
        market_id: MarketId,
        event_id: EventId,
        position_id: PositionId,
        outcome_label: String,
        price: Decimal,
    },
    MarketResolved {
        market_id: MarketId,
        event_id: EventId,
        winning_outcome: Option<String>,
        active_markets: u32,
        resolved_markets: u32,
    },
}

impl DomainEvent {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate { .. } => "price_update",
            Self::MarketResolved { .. } => "market_resolved",
        }
    }

    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        match self {
            Self::PriceUpdate { market_id, .. } | Self::MarketResolved { market_id, .. } => {
                market_id
            }
        }
    }
}

impl From<PriceChange> for DomainEvent {
    fn from(change: PriceChange) -> Self {
        Self::PriceUpdate {
            market_id: change.market_id,
            event_id: change.event_id,
            position_id: change.position_id,
            outcome_label: change.outcome_label,
            price: change.price,
        }
    }
}

impl From<Resolution> for DomainEvent {
    fn from(resolution: Resolution) -> Self {
        Self::MarketResolved {
            market_id: resolution.market_id,
            event_id: resolution.event_id,
            winning_outcome: resolution.winning_outcome,
            active_markets: resolution.active_markets,
            resolved_markets: resolution.resolved_markets,
        }
    }
}
