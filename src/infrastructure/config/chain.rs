//! On-chain transfer log configuration.

use serde::Deserialize;

/// JSON-RPC endpoint and window settings for transfer replay.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Conditional Tokens (ERC-1155) contract emitting the transfers.
    #[serde(default = "default_ctf_address")]
    pub ctf_address: String,
    /// Maximum number of blocks per `eth_getLogs` query.
    #[serde(default = "default_window_size")]
    pub window_size: u64,
    /// First block to replay from. Defaults to the block that deployed the
    /// Polygon CTF contract, so no window scans blocks before it existed.
    #[serde(default = "default_start_block")]
    pub start_block: u64,
}

fn default_rpc_url() -> String {
    "https://polygon-rpc.com".into()
}

fn default_ctf_address() -> String {
    "0x4D97DCd97eC945f40cF65F87097ACe5EA0476045".into()
}

const fn default_window_size() -> u64 {
    5_000
}

/// Polygon block containing the CTF contract deployment.
pub const CTF_DEPLOYMENT_BLOCK: u64 = 4_023_686;

const fn default_start_block() -> u64 {
    CTF_DEPLOYMENT_BLOCK
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            ctf_address: default_ctf_address(),
            window_size: default_window_size(),
            start_block: default_start_block(),
        }
    }
}
