//! Polymarket market-channel WebSocket message types.
//!
//! Frames carry either one object or an array of objects, each tagged by
//! `event_type`:
//!
//! ```json
//! {"event_type":"price_change","market":"0x...","price_changes":[{"asset_id":"123","price":"0.52"}]}
//! {"event_type":"last_trade_price","asset_id":"123","market":"0x...","price":"0.51"}
//! {"event_type":"market_resolved","market":"0x...","winning_asset_id":"123","winning_outcome":"Yes"}
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subscription request sent after connecting.
#[derive(Debug, Serialize)]
pub struct PolymarketSubscribeMessage {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Enables `market_resolved` notifications.
    pub custom_feature_enabled: bool,
}

impl PolymarketSubscribeMessage {
    pub fn new(asset_ids: Vec<String>) -> Self {
        Self {
            assets_ids: asset_ids,
            msg_type: "market".into(),
            custom_feature_enabled: true,
        }
    }
}

/// A frame: one message or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PolymarketFrame {
    Many(Vec<PolymarketWsMessage>),
    One(PolymarketWsMessage),
}

impl PolymarketFrame {
    pub fn into_messages(self) -> Vec<PolymarketWsMessage> {
        match self {
            Self::Many(messages) => messages,
            Self::One(message) => vec![message],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PolymarketWsMessage {
    PriceChange {
        #[serde(default)]
        price_changes: Vec<PolymarketPriceChange>,
    },
    LastTradePrice {
        asset_id: String,
        price: Decimal,
    },
    MarketResolved {
        market: String,
        #[serde(default)]
        winning_asset_id: Option<String>,
        #[serde(default)]
        winning_outcome: Option<String>,
    },
    /// Book snapshots, tick size changes and anything newer.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct PolymarketPriceChange {
    pub asset_id: String,
    pub price: Decimal,
}
