//! Application services (use cases).
//!
//! - [`dispatch`] - rate-limited, retrying request dispatcher
//! - [`reconstruct`] - holder reconstruction from the transfer log
//! - [`settlement`] - winner derivation for tracked markets
//! - [`state`] - shared market table and winner book
//! - [`fanout`] - subscriber set
//! - [`channel`] - streaming update channel
//! - [`refresh`] - full market refresh

pub mod channel;
pub mod dispatch;
pub mod fanout;
pub mod reconstruct;
pub mod refresh;
pub mod settlement;
pub mod state;

pub use channel::{Backoff, ChannelState, UpdateChannel};
pub use dispatch::{DispatchPolicy, RequestDispatcher};
pub use fanout::{SubscriberId, SubscriberSet};
pub use reconstruct::BalanceReconstructor;
pub use refresh::{MarketRefresher, RefreshSummary};
pub use settlement::SettlementService;
pub use state::MarketState;
