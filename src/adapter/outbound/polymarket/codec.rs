//! Polymarket implementation of the [`StreamCodec`] port.

use tracing::trace;

use super::dto::message::{PolymarketFrame, PolymarketSubscribeMessage, PolymarketWsMessage};
use crate::domain::{MarketId, PositionId};
use crate::error::Result;
use crate::port::{StreamCodec, StreamUpdate};

/// Encodes subscriptions and decodes market-channel frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolymarketCodec;

impl PolymarketCodec {
    fn updates(message: PolymarketWsMessage) -> Vec<StreamUpdate> {
        match message {
            PolymarketWsMessage::PriceChange { price_changes } => price_changes
                .into_iter()
                .map(|change| StreamUpdate::Price {
                    position_id: PositionId::new(change.asset_id),
                    price: change.price,
                })
                .collect(),
            PolymarketWsMessage::LastTradePrice { asset_id, price } => {
                vec![StreamUpdate::Price {
                    position_id: PositionId::new(asset_id),
                    price,
                }]
            }
            PolymarketWsMessage::MarketResolved {
                market,
                winning_asset_id,
                winning_outcome,
            } => vec![StreamUpdate::Resolved {
                market_id: MarketId::new(market),
                winning_position: winning_asset_id.map(PositionId::new),
                winning_outcome,
            }],
            PolymarketWsMessage::Other => Vec::new(),
        }
    }
}

impl StreamCodec for PolymarketCodec {
    fn subscribe_request(&self, position_ids: &[PositionId]) -> Result<String> {
        let assets = position_ids.iter().map(|p| p.as_str().to_string()).collect();
        Ok(serde_json::to_string(&PolymarketSubscribeMessage::new(assets))?)
    }

    fn decode(&self, frame: &str) -> Result<Vec<StreamUpdate>> {
        let frame = frame.trim();
        if frame.is_empty() || frame.eq_ignore_ascii_case("pong") {
            trace!("Heartbeat reply");
            return Ok(Vec::new());
        }
        let parsed: PolymarketFrame = serde_json::from_str(frame)?;
        Ok(parsed
            .into_messages()
            .into_iter()
            .flat_map(Self::updates)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::Value;

    #[test]
    fn subscribe_request_lists_assets() {
        let request = PolymarketCodec
            .subscribe_request(&[PositionId::new("111"), PositionId::new("222")])
            .unwrap();

        let value: Value = serde_json::from_str(&request).unwrap();
        assert_eq!(value["type"], "market");
        assert_eq!(value["assets_ids"], serde_json::json!(["111", "222"]));
        assert_eq!(value["custom_feature_enabled"], true);
    }

    #[test]
    fn price_change_yields_one_update_per_asset() {
        let frame = r#"{"event_type":"price_change","market":"0xm","timestamp":"1","price_changes":[
            {"asset_id":"111","price":"0.52","size":"10","side":"BUY"},
            {"asset_id":"222","price":"0.48","size":"10","side":"SELL"}]}"#;

        let updates = PolymarketCodec.decode(frame).unwrap();

        assert_eq!(
            updates,
            vec![
                StreamUpdate::Price {
                    position_id: PositionId::new("111"),
                    price: Decimal::new(52, 2),
                },
                StreamUpdate::Price {
                    position_id: PositionId::new("222"),
                    price: Decimal::new(48, 2),
                },
            ]
        );
    }

    #[test]
    fn batched_frame_with_books_and_trades() {
        let frame = r#"[
            {"event_type":"book","asset_id":"111","market":"0xm","bids":[],"asks":[]},
            {"event_type":"last_trade_price","asset_id":"111","market":"0xm","price":"0.9"}
        ]"#;

        let updates = PolymarketCodec.decode(frame).unwrap();

        assert_eq!(
            updates,
            vec![StreamUpdate::Price {
                position_id: PositionId::new("111"),
                price: Decimal::new(9, 1),
            }]
        );
    }

    #[test]
    fn market_resolved_carries_winner() {
        let frame = r#"{"event_type":"market_resolved","market":"0xm","winning_asset_id":"111","winning_outcome":"Yes"}"#;

        let updates = PolymarketCodec.decode(frame).unwrap();

        assert_eq!(
            updates,
            vec![StreamUpdate::Resolved {
                market_id: MarketId::new("0xm"),
                winning_position: Some(PositionId::new("111")),
                winning_outcome: Some("Yes".into()),
            }]
        );
    }

    #[test]
    fn heartbeat_reply_is_empty() {
        assert!(PolymarketCodec.decode("PONG").unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(PolymarketCodec.decode("{not json").is_err());
        assert!(PolymarketCodec.decode(r#"{"no_event_type":true}"#).is_err());
    }
}
