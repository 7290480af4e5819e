//! Exchange-agnostic domain types.
//!
//! - [`id`] - identifier newtypes
//! - [`market`] - markets, events, and the market-state table
//! - [`transfer`] - outcome tokens and transfer events
//! - [`ledger`] - holder ledger folded from transfers
//! - [`winner`] - winner records
//! - [`event`] - domain events delivered to subscribers

pub mod event;
pub mod id;
pub mod ledger;
pub mod market;
pub mod transfer;
pub mod winner;

pub use event::DomainEvent;
pub use id::{EventId, MarketId, PositionId};
pub use ledger::HolderLedger;
pub use market::{Event, Market, MarketStatus, MarketTable, Outcome, PriceChange, Resolution};
pub use transfer::{OutcomeToken, TransferEvent, TransferKind};
pub use winner::{WinnerEntry, WinnerRecord};
