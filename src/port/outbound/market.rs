//! Market-data port.

use async_trait::async_trait;

use crate::domain::{Event, Market};
use crate::error::DispatchError;

/// One page of parsed events and their markets.
#[derive(Debug, Clone, Default)]
pub struct MarketPage {
    pub events: Vec<Event>,
    pub markets: Vec<Market>,
    /// Records returned upstream, including any dropped while parsing.
    pub raw_count: usize,
}

/// Paginated source of events and markets.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<MarketPage, DispatchError>;
}
