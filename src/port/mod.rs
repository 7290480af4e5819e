//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! - [`Upstream`] - one classified outbound HTTP call
//! - [`TransferSource`] - on-chain transfer logs
//! - [`MarketSource`] - paginated market data
//! - [`SnapshotStore`] - persisted market snapshot
//! - [`PushTransport`] - streaming connection
//! - [`StreamCodec`] - streaming wire format
//! - [`Subscriber`] - domain event sink

pub mod outbound;

pub use outbound::codec::{StreamCodec, StreamUpdate};
pub use outbound::market::{MarketPage, MarketSource};
pub use outbound::store::{Snapshot, SnapshotStore};
pub use outbound::subscriber::{LogSubscriber, Subscriber};
pub use outbound::transfer::TransferSource;
pub use outbound::transport::PushTransport;
pub use outbound::upstream::{Target, Upstream};
