//! Markets, their events, and the single market-state table.
//!
//! Markets live in one table keyed by condition id. Resolution is an
//! in-place status transition followed by a recount of the owning event;
//! listings are derived by filtering on status.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{EventId, MarketId, PositionId};

/// One tradable outcome of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub label: String,
    pub position_id: PositionId,
    /// Last known price in [0, 1].
    pub price: Option<Decimal>,
}

/// Lifecycle of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MarketStatus {
    #[default]
    Active,
    /// Trading closed without a known resolution.
    Closed,
    Resolved { winning_outcome: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub event_id: EventId,
    pub question: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub status: MarketStatus,
    /// All-time volume in USD.
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Market {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, MarketStatus::Active)
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.status, MarketStatus::Resolved { .. })
    }

    /// Outcome by label, ignoring ASCII case.
    #[must_use]
    pub fn outcome(&self, label: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(label))
    }

    #[must_use]
    pub fn outcome_by_position(&self, position_id: &PositionId) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| &o.position_id == position_id)
    }

    /// The highest-priced outcome strictly above `threshold`, if any.
    #[must_use]
    pub fn leading_outcome(&self, threshold: Decimal) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.price.is_some_and(|p| p > threshold))
            .max_by_key(|o| o.price)
    }

    /// The outcome recorded as the winner on resolution, if known.
    #[must_use]
    pub fn winning_outcome(&self) -> Option<&Outcome> {
        match &self.status {
            MarketStatus::Resolved {
                winning_outcome: Some(label),
            } => self.outcome(label),
            _ => None,
        }
    }
}

/// An event groups related markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub active_markets: u32,
    #[serde(default)]
    pub resolved_markets: u32,
}

/// Result of applying a price change.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub market_id: MarketId,
    pub event_id: EventId,
    pub position_id: PositionId,
    pub outcome_label: String,
    pub price: Decimal,
}

/// Result of a status transition to resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub market_id: MarketId,
    pub event_id: EventId,
    pub winning_outcome: Option<String>,
    pub active_markets: u32,
    pub resolved_markets: u32,
}

/// The market-state table: events, markets, and a position index.
#[derive(Debug, Clone, Default)]
pub struct MarketTable {
    events: BTreeMap<EventId, Event>,
    markets: BTreeMap<MarketId, Market>,
    positions: HashMap<PositionId, MarketId>,
}

impl MarketTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table and derive every event's counters from market status.
    pub fn from_parts(events: Vec<Event>, markets: Vec<Market>) -> Self {
        let mut table = Self {
            events: events.into_iter().map(|e| (e.id.clone(), e)).collect(),
            markets: markets.into_iter().map(|m| (m.id.clone(), m)).collect(),
            positions: HashMap::new(),
        };
        table.reindex();
        table
    }

    fn reindex(&mut self) {
        self.positions = self
            .markets
            .values()
            .flat_map(|m| {
                m.outcomes
                    .iter()
                    .map(move |o| (o.position_id.clone(), m.id.clone()))
            })
            .collect();

        for event in self.events.values_mut() {
            event.active_markets = 0;
            event.resolved_markets = 0;
        }
        for market in self.markets.values() {
            if let Some(event) = self.events.get_mut(&market.event_id) {
                match market.status {
                    MarketStatus::Active => event.active_markets += 1,
                    MarketStatus::Resolved { .. } => event.resolved_markets += 1,
                    MarketStatus::Closed => {}
                }
            }
        }
    }

    fn recount(&mut self, event_id: &EventId) {
        let (mut active, mut resolved) = (0u32, 0u32);
        for market in self.markets.values().filter(|m| &m.event_id == event_id) {
            match market.status {
                MarketStatus::Active => active += 1,
                MarketStatus::Resolved { .. } => resolved += 1,
                MarketStatus::Closed => {}
            }
        }
        if let Some(event) = self.events.get_mut(event_id) {
            event.active_markets = active;
            event.resolved_markets = resolved;
        }
    }

    #[must_use]
    pub fn market(&self, id: &MarketId) -> Option<&Market> {
        self.markets.get(id)
    }

    #[must_use]
    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn active_markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values().filter(|m| m.is_active())
    }

    pub fn resolved_markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values().filter(|m| m.is_resolved())
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Position ids of every active market, for stream subscriptions.
    #[must_use]
    pub fn active_position_ids(&self) -> Vec<PositionId> {
        self.active_markets()
            .flat_map(|m| m.outcomes.iter().map(|o| o.position_id.clone()))
            .collect()
    }

    /// Set the current price of one outcome.
    ///
    /// Returns `None` when the position is unknown.
    pub fn update_price(&mut self, position_id: &PositionId, price: Decimal) -> Option<PriceChange> {
        let market_id = self.positions.get(position_id)?;
        let market = self.markets.get_mut(market_id)?;
        let outcome = market
            .outcomes
            .iter_mut()
            .find(|o| &o.position_id == position_id)?;
        outcome.price = Some(price);

        Some(PriceChange {
            market_id: market.id.clone(),
            event_id: market.event_id.clone(),
            position_id: position_id.clone(),
            outcome_label: outcome.label.clone(),
            price,
        })
    }

    /// Transition a market to resolved and recount its event.
    ///
    /// Returns `None` when the market is unknown or already resolved.
    pub fn resolve(
        &mut self,
        market_id: &MarketId,
        winning_outcome: Option<String>,
    ) -> Option<Resolution> {
        let market = self.markets.get_mut(market_id)?;
        if market.is_resolved() {
            return None;
        }
        market.status = MarketStatus::Resolved {
            winning_outcome: winning_outcome.clone(),
        };
        let event_id = market.event_id.clone();
        self.recount(&event_id);

        let (active_markets, resolved_markets) = self
            .events
            .get(&event_id)
            .map(|e| (e.active_markets, e.resolved_markets))
            .unwrap_or_default();

        Some(Resolution {
            market_id: market_id.clone(),
            event_id,
            winning_outcome,
            active_markets,
            resolved_markets,
        })
    }

    /// Consume the table into its events and markets.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Event>, Vec<Market>) {
        (
            self.events.into_values().collect(),
            self.markets.into_values().collect(),
        )
    }

    /// Owned copies of the table contents, for persistence.
    #[must_use]
    pub fn to_parts(&self) -> (Vec<Event>, Vec<Market>) {
        (
            self.events.values().cloned().collect(),
            self.markets.values().cloned().collect(),
        )
    }
}
