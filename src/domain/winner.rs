//! Winner records derived from a reconstructed ledger.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, PositionId};
use super::ledger::HolderLedger;

/// One holder of the winning outcome.
///
/// Winning tokens redeem 1:1, so `payout` always equals `tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub address: Address,
    pub tokens: U256,
    pub payout: U256,
}

/// Immutable snapshot of the holders of one market outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub market_id: MarketId,
    pub position_id: PositionId,
    pub outcome_label: String,
    pub resolution_sequence_number: u64,
    /// Ordered by tokens descending, then address.
    pub winners: Vec<WinnerEntry>,
    pub total_payout: U256,
    pub winner_count: usize,
    pub computed_at: DateTime<Utc>,
}

impl WinnerRecord {
    /// Map every surviving ledger entry to a winner.
    pub fn from_ledger(
        market_id: MarketId,
        outcome_label: impl Into<String>,
        ledger: &HolderLedger,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let mut winners: Vec<WinnerEntry> = ledger
            .iter()
            .map(|(address, tokens)| WinnerEntry {
                address: *address,
                tokens: *tokens,
                payout: *tokens,
            })
            .collect();
        winners.sort_by(|a, b| b.tokens.cmp(&a.tokens).then(a.address.cmp(&b.address)));

        Self {
            market_id,
            position_id: ledger.position_id().clone(),
            outcome_label: outcome_label.into(),
            resolution_sequence_number: ledger.cutoff(),
            winner_count: winners.len(),
            winners,
            total_payout: ledger.total(),
            computed_at,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}
