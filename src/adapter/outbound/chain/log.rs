//! ERC-1155 transfer log decoding.
//!
//! Topic layout for both events: `[signature, operator, from, to]`.
//! `TransferSingle` data is `(id, value)`; `TransferBatch` data is two
//! ABI-encoded dynamic arrays `(uint256[] ids, uint256[] values)`.

use alloy_primitives::{b256, Address, Bytes, B256, U256};
use serde::Deserialize;

use crate::domain::{PositionId, TransferEvent};

/// `keccak256("TransferSingle(address,address,address,uint256,uint256)")`
pub const TRANSFER_SINGLE_TOPIC: B256 =
    b256!("c3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62");

/// `keccak256("TransferBatch(address,address,address,uint256[],uint256[])")`
pub const TRANSFER_BATCH_TOPIC: B256 =
    b256!("4a39dc06d4c0dbc64b70af90fd698a233a518aa5d07e595d983b8c0526c8f7fb");

const WORD: usize = 32;

/// A log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    /// Set when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

/// Why a log could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    UnknownTopic,
    MissingTopics(usize),
    MissingBlock,
    BadData(&'static str),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTopic => f.write_str("not an ERC-1155 transfer"),
            Self::MissingTopics(n) => write!(f, "expected 4 topics, got {n}"),
            Self::MissingBlock => f.write_str("missing or invalid block number"),
            Self::BadData(reason) => write!(f, "bad log data: {reason}"),
        }
    }
}

impl RpcLog {
    /// Decode into one transfer per transferred id.
    pub fn decode(&self) -> Result<Vec<TransferEvent>, LogError> {
        let signature = self.topics.first().ok_or(LogError::MissingTopics(0))?;
        let is_single = *signature == TRANSFER_SINGLE_TOPIC;
        if !is_single && *signature != TRANSFER_BATCH_TOPIC {
            return Err(LogError::UnknownTopic);
        }
        if self.topics.len() < 4 {
            return Err(LogError::MissingTopics(self.topics.len()));
        }

        let sender = Address::from_slice(&self.topics[2][12..]);
        let recipient = Address::from_slice(&self.topics[3][12..]);
        let sequence_number = self
            .block_number
            .as_deref()
            .and_then(parse_quantity)
            .ok_or(LogError::MissingBlock)?;
        let log_index = self
            .log_index
            .as_deref()
            .and_then(parse_quantity)
            .unwrap_or_default();

        let pairs = if is_single {
            let id = word(&self.data, 0).ok_or(LogError::BadData("short single data"))?;
            let value = word(&self.data, WORD).ok_or(LogError::BadData("short single data"))?;
            vec![(id, value)]
        } else {
            let ids = array(&self.data, 0).ok_or(LogError::BadData("bad ids array"))?;
            let values = array(&self.data, WORD).ok_or(LogError::BadData("bad values array"))?;
            if ids.len() != values.len() {
                return Err(LogError::BadData("ids and values differ in length"));
            }
            ids.into_iter().zip(values).collect()
        };

        Ok(pairs
            .into_iter()
            .map(|(id, amount)| TransferEvent {
                position_id: PositionId::from(id),
                sender,
                recipient,
                amount,
                sequence_number,
                log_index,
            })
            .collect())
    }
}

/// Parse a JSON-RPC hex quantity such as `0x1b4`.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).ok()
}

fn word(data: &[u8], offset: usize) -> Option<U256> {
    let end = offset.checked_add(WORD)?;
    data.get(offset..end).map(U256::from_be_slice)
}

fn usize_word(data: &[u8], offset: usize) -> Option<usize> {
    usize::try_from(word(data, offset)?).ok()
}

/// Dynamic `uint256[]` whose head offset is stored at `head`.
fn array(data: &[u8], head: usize) -> Option<Vec<U256>> {
    let start = usize_word(data, head)?;
    let len = usize_word(data, start)?;
    let body = start.checked_add(WORD)?;
    if len > data.len() / WORD {
        return None;
    }
    (0..len).map(|i| word(data, body + i * WORD)).collect()
}
