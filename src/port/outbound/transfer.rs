//! Transfer-log port.

use async_trait::async_trait;

use crate::domain::{PositionId, TransferEvent};
use crate::error::DispatchError;

/// Source of on-chain transfer events for outcome tokens.
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Transfers of `position_id` in blocks `from..=to`, in emission order.
    async fn query_transfers(
        &self,
        position_id: &PositionId,
        from: u64,
        to: u64,
    ) -> Result<Vec<TransferEvent>, DispatchError>;

    /// Latest block number, used as the default cutoff.
    async fn head_sequence(&self) -> Result<u64, DispatchError>;
}
