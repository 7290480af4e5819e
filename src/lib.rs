//! Settler - prediction market settlement watcher.
//!
//! Keeps a table of prediction markets current from a paginated API and a
//! live push stream, and reconstructs who holds the winning outcome token of
//! a resolved market by replaying on-chain ERC-1155 transfers.
//!
//! # Architecture
//!
//! - [`domain`] - markets, transfers, holder ledgers, winner records
//! - [`port`] - traits the application needs from the outside world
//! - [`application`] - request dispatcher, balance reconstructor, streaming
//!   update channel, market refresh and settlement
//! - [`adapter`] - HTTP, JSON-RPC, WebSocket, JSON file and CLI adapters
//! - [`infrastructure`] - configuration, logging and wiring
//!
//! # Example
//!
//! ```no_run
//! use settler::infrastructure::bootstrap::{self, Components};
//! use settler::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> settler::error::Result<()> {
//! let config = Config::load_or_default("config.toml")?;
//! let components = Components::build(&config)?;
//! let settlement = bootstrap::build_settlement(&config, &components)?;
//! let record = settlement
//!     .winners_for_market(&"0xabc".into(), Some("Yes"), None)
//!     .await?;
//! println!("{} holders", record.winner_count);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
