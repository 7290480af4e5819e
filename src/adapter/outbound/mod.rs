//! Outbound adapters (driven side).

pub mod chain;
pub mod http;
pub mod polymarket;
pub mod store;
