//! Stream message codec port.

use rust_decimal::Decimal;

use crate::domain::{MarketId, PositionId};
use crate::error::Result;

/// A parsed push message, before it is applied to market state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// New price for one outcome token.
    Price {
        position_id: PositionId,
        price: Decimal,
    },
    /// The market was resolved upstream.
    Resolved {
        market_id: MarketId,
        winning_position: Option<PositionId>,
        winning_outcome: Option<String>,
    },
}

/// Exchange-specific wire format of the streaming channel.
pub trait StreamCodec: Send + Sync {
    /// Subscription request for the given asset ids.
    fn subscribe_request(&self, position_ids: &[PositionId]) -> Result<String>;

    /// Decode one text frame into zero or more updates.
    ///
    /// Frames that carry nothing of interest decode to an empty list; an
    /// error means the frame could not be understood at all.
    fn decode(&self, frame: &str) -> Result<Vec<StreamUpdate>>;
}
