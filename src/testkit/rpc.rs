//! JSON-RPC log builders for chain adapter tests.

use alloy_primitives::{Address, U256};
use serde_json::{json, Value};

use crate::adapter::outbound::chain::log::{TRANSFER_BATCH_TOPIC, TRANSFER_SINGLE_TOPIC};

/// Address topic: the address left-padded to 32 bytes.
pub fn topic_for(address: Address) -> String {
    format!("0x{:0>64}", hex_of(address.as_slice()))
}

fn hex_of(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn words(values: &[U256]) -> String {
    let mut out = String::from("0x");
    for v in values {
        out.push_str(&hex_of(&v.to_be_bytes::<32>()));
    }
    out
}

/// JSON for a `TransferSingle` log.
pub fn single_log(
    from: Address,
    to: Address,
    id: u64,
    value: u64,
    block: u64,
    index: u64,
) -> Value {
    json!({
        "address": "0x4d97dcd97ec945f40cf65f87097ace5ea0476045",
        "topics": [
            format!("{TRANSFER_SINGLE_TOPIC}"),
            topic_for(Address::ZERO),
            topic_for(from),
            topic_for(to),
        ],
        "data": words(&[U256::from(id), U256::from(value)]),
        "blockNumber": format!("{block:#x}"),
        "logIndex": format!("{index:#x}"),
        "removed": false
    })
}

/// JSON for a `TransferBatch` log.
pub fn batch_log(
    from: Address,
    to: Address,
    items: &[(u64, u64)],
    block: u64,
) -> Value {
    let n = items.len();
    let mut data = vec![
        U256::from(64),
        U256::from(64 + 32 * (n + 1)),
        U256::from(n),
    ];
    data.extend(items.iter().map(|(id, _)| U256::from(*id)));
    data.push(U256::from(n));
    data.extend(items.iter().map(|(_, value)| U256::from(*value)));
    json!({
        "address": "0x4d97dcd97ec945f40cf65f87097ace5ea0476045",
        "topics": [
            format!("{TRANSFER_BATCH_TOPIC}"),
            topic_for(Address::ZERO),
            topic_for(from),
            topic_for(to),
        ],
        "data": words(&data),
        "blockNumber": format!("{block:#x}"),
        "logIndex": "0x0"
    })
}

/// A JSON-RPC success envelope.
pub fn rpc_result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}
