//! Gamma API response types.
//!
//! `GET /events` returns a flat JSON array of events, each embedding its
//! markets. Several list fields are JSON-encoded strings and numeric fields
//! arrive as either numbers or strings, so parsing is lenient and done one
//! record at a time: a bad record is dropped with a warning, the rest of the
//! page survives.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Event, EventId, Market, MarketId, MarketStatus, Outcome, PositionId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    /// Parsed individually, see [`GammaEvent::into_domain`].
    #[serde(default)]
    pub markets: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    pub condition_id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub closed: bool,
    /// JSON-encoded outcome names (e.g., `["Yes", "No"]`).
    #[serde(default)]
    pub outcomes: Option<String>,
    /// JSON-encoded outcome prices (e.g., `["0.65", "0.35"]`).
    #[serde(default)]
    pub outcome_prices: Option<String>,
    /// JSON-encoded CLOB token ids, one per outcome.
    #[serde(default)]
    pub clob_token_ids: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_num: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl GammaEvent {
    /// Convert to domain types, dropping markets that fail to parse.
    pub fn into_domain(self) -> (Event, Vec<Market>) {
        let event_id = EventId::new(self.id);
        let markets: Vec<Market> = self
            .markets
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<GammaMarket>(raw) {
                Ok(market) => match market.to_market(&event_id) {
                    Ok(market) => Some(market),
                    Err(reason) => {
                        warn!(event_id = %event_id, condition_id = %market.condition_id, reason, "Dropping market");
                        None
                    }
                },
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "Dropping unparseable market");
                    None
                }
            })
            .collect();

        let event = Event {
            title: self.title.unwrap_or_default(),
            slug: self.slug,
            volume: self.volume.unwrap_or_default(),
            active_markets: 0,
            resolved_markets: 0,
            id: event_id,
        };
        (event, markets)
    }
}

impl GammaMarket {
    /// Build a domain market; `Err` carries the reason the record is unusable.
    pub fn to_market(&self, event_id: &EventId) -> Result<Market, &'static str> {
        let tokens = decode_list(self.clob_token_ids.as_deref()).ok_or("bad clobTokenIds")?;
        let labels = decode_list(self.outcomes.as_deref()).ok_or("bad outcomes")?;
        if tokens.is_empty() {
            return Err("no outcome tokens");
        }
        if tokens.len() != labels.len() {
            return Err("outcome and token counts differ");
        }

        let prices: Vec<Option<Decimal>> = match decode_list(self.outcome_prices.as_deref()) {
            Some(prices) if prices.len() == tokens.len() => {
                prices.iter().map(|p| p.trim().parse().ok()).collect()
            }
            _ => {
                debug!(condition_id = %self.condition_id, "Missing or mismatched outcome prices");
                vec![None; tokens.len()]
            }
        };

        let outcomes = labels
            .into_iter()
            .zip(tokens)
            .zip(prices)
            .map(|((label, token), price)| Outcome {
                label,
                position_id: PositionId::new(token),
                price,
            })
            .collect();

        Ok(Market {
            id: MarketId::new(self.condition_id.clone()),
            event_id: event_id.clone(),
            question: self.question.clone().unwrap_or_default(),
            slug: self.slug.clone(),
            outcomes,
            status: if self.closed {
                MarketStatus::Closed
            } else {
                MarketStatus::Active
            },
            volume: self.volume_num.or(self.volume).unwrap_or_default(),
            end_date: self
                .end_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
    }
}

fn decode_list(raw: Option<&str>) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw?).ok()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
