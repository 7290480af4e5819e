//! Conditional Tokens transfer source over JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::log::{parse_quantity, RpcLog, TRANSFER_BATCH_TOPIC, TRANSFER_SINGLE_TOPIC};
use crate::application::RequestDispatcher;
use crate::domain::{PositionId, TransferEvent};
use crate::error::DispatchError;
use crate::port::{Target, TransferSource};

/// Reads ERC-1155 transfers of the CTF contract with `eth_getLogs`.
///
/// Position ids are not indexed topics, so every transfer in the window is
/// fetched and filtered locally.
pub struct CtfTransferSource {
    dispatcher: RequestDispatcher,
    rpc_url: String,
    contract: Address,
    next_id: AtomicU64,
}

impl CtfTransferSource {
    pub fn new(dispatcher: RequestDispatcher, rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            dispatcher,
            rpc_url: rpc_url.into(),
            contract,
            next_id: AtomicU64::new(1),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, DispatchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let target = Target::post_json(&self.rpc_url, body);
        let label = target.to_string();

        let mut response = self.dispatcher.dispatch(target).await?;
        match response.get_mut("result").map(Value::take) {
            Some(result) if !result.is_null() => Ok(result),
            _ => Err(DispatchError::Malformed {
                target: label,
                reason: "missing result".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TransferSource for CtfTransferSource {
    async fn query_transfers(
        &self,
        position_id: &PositionId,
        from: u64,
        to: u64,
    ) -> Result<Vec<TransferEvent>, DispatchError> {
        let params = json!([{
            "address": self.contract,
            "fromBlock": format!("{from:#x}"),
            "toBlock": format!("{to:#x}"),
            "topics": [[TRANSFER_SINGLE_TOPIC, TRANSFER_BATCH_TOPIC]],
        }]);
        let result = self.rpc("eth_getLogs", params).await?;
        let malformed = |reason: String| DispatchError::Malformed {
            target: format!("POST {} (eth_getLogs)", self.rpc_url),
            reason,
        };

        let logs: Vec<RpcLog> = serde_json::from_value(result).map_err(|e| malformed(e.to_string()))?;
        let total = logs.len();

        let mut transfers = Vec::new();
        for log in logs.iter().filter(|l| !l.removed) {
            let decoded = log.decode().map_err(|e| malformed(e.to_string()))?;
            transfers.extend(decoded.into_iter().filter(|t| &t.position_id == position_id));
        }
        transfers.sort_by_key(|t| (t.sequence_number, t.log_index));

        debug!(position_id = %position_id, from, to, logs = total, matched = transfers.len(), "Transfer window fetched");
        Ok(transfers)
    }

    async fn head_sequence(&self) -> Result<u64, DispatchError> {
        let result = self.rpc("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| DispatchError::Malformed {
                target: format!("POST {} (eth_blockNumber)", self.rpc_url),
                reason: format!("not a hex quantity: {result}"),
            })
    }
}
