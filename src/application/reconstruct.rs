//! Holder reconstruction from the transfer log.
//!
//! The transfer log is append-only and unbounded, so it is replayed in
//! contiguous windows of at most `window_size` blocks, strictly in order and
//! one window at a time. A failed window aborts the whole reconstruction;
//! there is no partial ledger.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{HolderLedger, MarketId, PositionId, WinnerRecord};
use crate::error::ReconstructError;
use crate::port::TransferSource;

/// Inclusive block windows covering `[start, end]`.
///
/// Empty when `start > end`. `size` must be non-zero.
pub fn windows(start: u64, end: u64, size: u64) -> impl Iterator<Item = (u64, u64)> {
    let size = size.max(1);
    let mut next = (start <= end).then_some(start);
    std::iter::from_fn(move || {
        let from = next?;
        let to = from.saturating_add(size - 1).min(end);
        next = if to >= end { None } else { Some(to + 1) };
        Some((from, to))
    })
}

/// Replays transfers of one position into a [`HolderLedger`].
pub struct BalanceReconstructor<S> {
    source: S,
    window_size: u64,
    start_sequence: u64,
}

impl<S: TransferSource> BalanceReconstructor<S> {
    pub fn new(source: S, window_size: u64) -> Self {
        Self {
            source,
            window_size: window_size.max(1),
            start_sequence: 0,
        }
    }

    /// First block replayed, usually the contract deployment block.
    #[must_use]
    pub const fn with_start_sequence(mut self, start_sequence: u64) -> Self {
        self.start_sequence = start_sequence;
        self
    }

    /// Latest block of the transfer source.
    pub async fn head(&self) -> Result<u64, ReconstructError> {
        self.source
            .head_sequence()
            .await
            .map_err(ReconstructError::Head)
    }

    /// Holders of `position_id` as of block `cutoff` (inclusive).
    pub async fn reconstruct(
        &self,
        position_id: &PositionId,
        cutoff: u64,
    ) -> Result<HolderLedger, ReconstructError> {
        if position_id.to_u256().is_none() {
            return Err(ReconstructError::InvalidPosition(position_id.to_string()));
        }

        let mut ledger = HolderLedger::new(position_id.clone(), cutoff);
        let mut window_count = 0usize;
        let mut event_count = 0usize;

        for (from, to) in windows(self.start_sequence, cutoff, self.window_size) {
            let events = self
                .source
                .query_transfers(position_id, from, to)
                .await
                .map_err(|source| {
                    warn!(
                        position_id = %position_id,
                        from,
                        to,
                        error = %source,
                        "Transfer window failed, aborting reconstruction"
                    );
                    ReconstructError::Window { from, to, source }
                })?;

            ledger.apply_all(
                events
                    .iter()
                    .filter(|e| &e.position_id == position_id)
                    .inspect(|_| event_count += 1),
            );
            window_count += 1;
            debug!(position_id = %position_id, from, to, holders = ledger.len(), "Window applied");
        }

        info!(
            position_id = %position_id,
            cutoff,
            windows = window_count,
            transfers = event_count,
            holders = ledger.len(),
            "Ledger reconstructed"
        );
        Ok(ledger)
    }

    /// Reconstruct the winning position and derive its winner record.
    pub async fn compute_winners(
        &self,
        market_id: &MarketId,
        position_id: &PositionId,
        outcome_label: &str,
        cutoff: u64,
    ) -> Result<WinnerRecord, ReconstructError> {
        let ledger = self.reconstruct(position_id, cutoff).await?;
        let record = WinnerRecord::from_ledger(market_id.clone(), outcome_label, &ledger, Utc::now());
        info!(
            market_id = %market_id,
            outcome = outcome_label,
            winners = record.winner_count,
            total_payout = %record.total_payout,
            "Winners computed"
        );
        Ok(record)
    }
}
