//! Winner derivation for markets in shared state.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::reconstruct::BalanceReconstructor;
use super::state::MarketState;
use crate::domain::{MarketId, OutcomeToken, WinnerRecord};
use crate::error::ReconstructError;
use crate::port::TransferSource;

/// Picks a market's winning outcome and reconstructs its holders.
pub struct SettlementService<S> {
    reconstructor: BalanceReconstructor<S>,
    state: Arc<MarketState>,
    win_threshold: Decimal,
}

impl<S: TransferSource> SettlementService<S> {
    pub fn new(
        reconstructor: BalanceReconstructor<S>,
        state: Arc<MarketState>,
        win_threshold: Decimal,
    ) -> Self {
        Self {
            reconstructor,
            state,
            win_threshold,
        }
    }

    /// Compute and store the winner record of `market_id`.
    ///
    /// The outcome is taken from `outcome_label` when given, otherwise from
    /// the recorded resolution, otherwise the outcome priced above the win
    /// threshold. `cutoff` defaults to the current chain head. Market status
    /// is never changed here.
    pub async fn winners_for_market(
        &self,
        market_id: &MarketId,
        outcome_label: Option<&str>,
        cutoff: Option<u64>,
    ) -> Result<WinnerRecord, ReconstructError> {
        let token = self.pick_outcome(market_id, outcome_label)?;
        let cutoff = match cutoff {
            Some(cutoff) => cutoff,
            None => self.reconstructor.head().await?,
        };

        let record = self
            .reconstructor
            .compute_winners(
                token.market_id(),
                token.position_id(),
                token.outcome_label(),
                cutoff,
            )
            .await?;
        self.state.record_winners(record.clone());
        info!(
            market_id = %market_id,
            outcome = token.outcome_label(),
            cutoff,
            "Winner record stored"
        );
        Ok(record)
    }

    fn pick_outcome(
        &self,
        market_id: &MarketId,
        outcome_label: Option<&str>,
    ) -> Result<OutcomeToken, ReconstructError> {
        self.state.read(|table| -> Result<_, ReconstructError> {
            let market = table
                .market(market_id)
                .ok_or_else(|| ReconstructError::UnknownMarket(market_id.to_string()))?;

            let outcome = match outcome_label {
                Some(label) => {
                    market
                        .outcome(label)
                        .ok_or_else(|| ReconstructError::UnknownOutcome {
                            market_id: market_id.to_string(),
                            label: label.to_string(),
                        })?
                }
                None => market
                    .winning_outcome()
                    .or_else(|| market.leading_outcome(self.win_threshold))
                    .ok_or_else(|| ReconstructError::Ambiguous {
                        market_id: market_id.to_string(),
                        threshold: self.win_threshold,
                    })?,
            };
            Ok(OutcomeToken::new(
                outcome.position_id.clone(),
                market.id.clone(),
                outcome.label.as_str(),
            ))
        })
    }
}
