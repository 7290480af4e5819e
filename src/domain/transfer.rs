//! Outcome tokens and the on-chain transfers that move them.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, PositionId};

/// One side of a market's outcome set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeToken {
    position_id: PositionId,
    market_id: MarketId,
    outcome_label: String,
}

impl OutcomeToken {
    pub fn new(
        position_id: PositionId,
        market_id: MarketId,
        outcome_label: impl Into<String>,
    ) -> Self {
        Self {
            position_id,
            market_id,
            outcome_label: outcome_label.into(),
        }
    }

    #[must_use]
    pub const fn position_id(&self) -> &PositionId {
        &self.position_id
    }

    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    #[must_use]
    pub fn outcome_label(&self) -> &str {
        &self.outcome_label
    }
}

/// How a transfer changes supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Sender is the null address.
    Mint,
    /// Recipient is the null address.
    Burn,
    /// Holder to holder.
    Transfer,
}

/// A single observed movement of `amount` units of one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub position_id: PositionId,
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
    /// Block height of the log.
    pub sequence_number: u64,
    /// Position of the log inside its block; orders events sharing a height.
    #[serde(default)]
    pub log_index: u64,
}

impl TransferEvent {
    #[must_use]
    pub fn kind(&self) -> TransferKind {
        if self.sender == Address::ZERO {
            TransferKind::Mint
        } else if self.recipient == Address::ZERO {
            TransferKind::Burn
        } else {
            TransferKind::Transfer
        }
    }

    /// Sort key matching on-chain emission order.
    #[must_use]
    pub const fn ordinal(&self) -> (u64, u64) {
        (self.sequence_number, self.log_index)
    }
}
