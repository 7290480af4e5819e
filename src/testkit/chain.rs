//! In-memory [`TransferSource`] backed by a fixed transfer log.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{PositionId, TransferEvent};
use crate::error::DispatchError;
use crate::port::TransferSource;

/// Serves range queries over a fixed log and records every queried window.
pub struct MemoryTransferSource {
    events: Vec<TransferEvent>,
    head: u64,
    fail_from: Option<(u64, DispatchError)>,
    queried: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl MemoryTransferSource {
    /// `events` are kept in the given order within a block.
    pub fn new(mut events: Vec<TransferEvent>) -> Self {
        events.sort_by_key(|e| e.sequence_number);
        let head = events.last().map_or(0, |e| e.sequence_number);
        Self {
            events,
            head,
            fail_from: None,
            queried: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_head(mut self, head: u64) -> Self {
        self.head = head;
        self
    }

    /// Fail the window starting at `from` with `err`.
    pub fn failing_window(mut self, from: u64, err: DispatchError) -> Self {
        self.fail_from = Some((from, err));
        self
    }

    /// Shared record of queried `(from, to)` windows.
    pub fn queried(&self) -> Arc<Mutex<Vec<(u64, u64)>>> {
        self.queried.clone()
    }
}

#[async_trait]
impl TransferSource for MemoryTransferSource {
    async fn query_transfers(
        &self,
        position_id: &PositionId,
        from: u64,
        to: u64,
    ) -> Result<Vec<TransferEvent>, DispatchError> {
        self.queried.lock().push((from, to));
        if let Some((fail_from, err)) = &self.fail_from {
            if *fail_from == from {
                return Err(err.clone());
            }
        }
        Ok(self
            .events
            .iter()
            .filter(|e| &e.position_id == position_id)
            .filter(|e| (from..=to).contains(&e.sequence_number))
            .cloned()
            .collect())
    }

    async fn head_sequence(&self) -> Result<u64, DispatchError> {
        Ok(self.head)
    }
}
