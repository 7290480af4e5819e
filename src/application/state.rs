//! Shared market state and the winner book.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use parking_lot::RwLock;

use tracing::debug;

use crate::domain::{MarketId, MarketStatus, MarketTable, WinnerRecord};
use crate::port::Snapshot;

/// The single market table plus computed winner records.
///
/// Writers are the streaming channel and the refresher; readers take
/// snapshots under the read lock.
#[derive(Default)]
pub struct MarketState {
    table: RwLock<MarketTable>,
    winners: RwLock<BTreeMap<MarketId, WinnerRecord>>,
}

impl MarketState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore state persisted by a previous run.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let table = MarketTable::from_parts(snapshot.events, snapshot.markets);
        let winners = snapshot
            .winners
            .into_iter()
            .map(|w| (w.market_id.clone(), w))
            .collect();
        Self {
            table: RwLock::new(table),
            winners: RwLock::new(winners),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&MarketTable) -> R) -> R {
        f(&self.table.read())
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut MarketTable) -> R) -> R {
        f(&mut self.table.write())
    }

    /// Replace the table with a complete listing.
    pub fn replace(&self, incoming: MarketTable) {
        self.merge(incoming, true);
    }

    /// Swap in freshly fetched data, keeping what the listing left out.
    ///
    /// Resolution is sticky: a market already resolved here stays resolved
    /// even when the new data reports it otherwise. Markets missing from the
    /// new data are carried over with their event. When the listing is
    /// complete, a missing market that is not resolved has dropped out of
    /// the upstream listing and is marked closed.
    pub fn merge(&self, incoming: MarketTable, listing_complete: bool) {
        let mut table = self.table.write();
        let (mut events, mut markets) = incoming.into_parts();

        for market in &mut markets {
            if let Some(previous) = table.market(&market.id) {
                if previous.is_resolved() && !market.is_resolved() {
                    market.status = previous.status.clone();
                }
            }
        }

        let market_ids: HashSet<MarketId> = markets.iter().map(|m| m.id.clone()).collect();
        let mut event_ids: HashSet<_> = events.iter().map(|e| e.id.clone()).collect();
        for previous in table.markets() {
            if market_ids.contains(&previous.id) {
                continue;
            }
            let mut carried = previous.clone();
            if listing_complete && carried.is_active() {
                debug!(market = %carried.id, "Market left the listing, marking closed");
                carried.status = MarketStatus::Closed;
            }
            markets.push(carried);
            if event_ids.insert(previous.event_id.clone()) {
                if let Some(event) = table.event(&previous.event_id) {
                    events.push(event.clone());
                }
            }
        }

        *table = MarketTable::from_parts(events, markets);
    }

    /// Store a winner record, overwriting any earlier one for the market.
    pub fn record_winners(&self, record: WinnerRecord) {
        self.winners.write().insert(record.market_id.clone(), record);
    }

    #[must_use]
    pub fn winners(&self, market_id: &MarketId) -> Option<WinnerRecord> {
        self.winners.read().get(market_id).cloned()
    }

    #[must_use]
    pub fn all_winners(&self) -> Vec<WinnerRecord> {
        self.winners.read().values().cloned().collect()
    }

    /// Point-in-time copy for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let (events, markets) = self.table.read().to_parts();
        Snapshot {
            events,
            markets,
            winners: self.all_winners(),
            saved_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HolderLedger, WinnerRecord};
    use crate::testkit::domain::{binary_market, event, event_id, market_id, position, sample_table};
    use rust_decimal::Decimal;

    #[test]
    fn snapshot_round_trips_through_state() {
        let state = MarketState::new();
        state.replace(sample_table());
        state.write(|t| t.resolve(&market_id("m1"), Some("Yes".into())));

        let restored = MarketState::from_snapshot(state.snapshot());

        restored.read(|t| {
            assert_eq!(t.market_count(), 2);
            assert!(t.market(&market_id("m1")).unwrap().is_resolved());
            let event = t.events().next().unwrap();
            assert_eq!((event.active_markets, event.resolved_markets), (1, 1));
        });
    }

    #[test]
    fn replace_keeps_resolution_sticky() {
        let state = MarketState::new();
        state.replace(sample_table());
        state.write(|t| t.resolve(&market_id("m1"), Some("No".into())));

        state.replace(sample_table());

        state.read(|t| {
            assert_eq!(
                t.market(&market_id("m1")).unwrap().status,
                MarketStatus::Resolved {
                    winning_outcome: Some("No".into())
                }
            );
            assert_eq!(t.active_markets().count(), 1);
        });
    }

    #[test]
    fn complete_listing_closes_markets_that_left_it() {
        let state = MarketState::new();
        state.replace(sample_table());
        state.write(|t| t.resolve(&market_id("m2"), Some("Yes".into())));

        let fresh = MarketTable::from_parts(
            vec![event("e2", "Other")],
            vec![binary_market("m3", "e2", "31", "32", Some(Decimal::new(4, 1)))],
        );
        state.replace(fresh);

        state.read(|t| {
            assert_eq!(t.market_count(), 3);
            assert_eq!(t.market(&market_id("m1")).unwrap().status, MarketStatus::Closed);
            assert!(t.market(&market_id("m2")).unwrap().is_resolved());
            assert_eq!(t.event_count(), 2);
            let carried = t.event(&event_id("e1")).unwrap();
            assert_eq!((carried.active_markets, carried.resolved_markets), (0, 1));
        });
    }

    #[test]
    fn partial_listing_keeps_missing_markets_active() {
        let state = MarketState::new();
        state.replace(sample_table());

        let fresh = MarketTable::from_parts(
            vec![event("e2", "Other")],
            vec![binary_market("m3", "e2", "31", "32", None)],
        );
        state.merge(fresh, false);

        state.read(|t| {
            assert_eq!(t.market_count(), 3);
            assert!(t.market(&market_id("m1")).unwrap().is_active());
            assert_eq!(t.active_position_ids().len(), 6);
        });
    }

    #[test]
    fn later_winner_record_overwrites_earlier() {
        let state = MarketState::new();
        let ledger = HolderLedger::new(position("11"), 10);
        let first = WinnerRecord::from_ledger(market_id("m1"), "Yes", &ledger, Utc::now());
        let mut second = first.clone();
        second.resolution_sequence_number = 20;

        state.record_winners(first);
        state.record_winners(second);

        let stored = state.winners(&market_id("m1")).unwrap();
        assert_eq!(stored.resolution_sequence_number, 20);
        assert_eq!(state.all_winners().len(), 1);
    }
}
