//! Full market refresh from the paginated market source.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::state::MarketState;
use crate::domain::{MarketId, MarketStatus, MarketTable};
use crate::error::DispatchError;
use crate::port::{MarketSource, SnapshotStore};

/// Counts from one refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub pages: usize,
    pub events: usize,
    pub markets: usize,
    /// Upstream event records dropped while parsing.
    pub dropped: usize,
    /// Closed markets inferred resolved from their prices.
    pub inferred_resolved: usize,
}

/// Pages through the market source and replaces shared state.
pub struct MarketRefresher<M> {
    source: M,
    state: Arc<MarketState>,
    store: Option<Arc<dyn SnapshotStore>>,
    page_size: usize,
    max_pages: usize,
    win_threshold: Decimal,
}

impl<M: MarketSource> MarketRefresher<M> {
    pub fn new(source: M, state: Arc<MarketState>, page_size: usize, max_pages: usize) -> Self {
        Self {
            source,
            state,
            store: None,
            page_size: page_size.max(1),
            max_pages,
            win_threshold: Decimal::new(9, 1),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub const fn with_win_threshold(mut self, threshold: Decimal) -> Self {
        self.win_threshold = threshold;
        self
    }

    /// Fetch every page, then merge the listing in one write.
    ///
    /// Any page failure aborts the refresh and leaves state untouched. A
    /// listing cut off by `max_pages` is merged without closing the
    /// markets it did not reach.
    pub async fn refresh(&self) -> Result<RefreshSummary, DispatchError> {
        let mut summary = RefreshSummary::default();
        let mut events = Vec::new();
        let mut markets = Vec::new();
        let mut raw = 0usize;
        let mut complete = false;

        for index in 0..self.max_pages {
            let page = self
                .source
                .fetch_page(index * self.page_size, self.page_size)
                .await?;
            summary.pages += 1;
            raw += page.raw_count;
            debug!(page = index, records = page.raw_count, "Fetched market page");

            let last = page.raw_count < self.page_size;
            events.extend(page.events);
            markets.extend(page.markets);
            if last {
                complete = true;
                break;
            }
        }
        if !complete {
            warn!(max_pages = self.max_pages, "Market listing truncated at page limit");
        }

        summary.events = events.len();
        summary.markets = markets.len();
        summary.dropped = raw.saturating_sub(events.len());

        self.state
            .merge(MarketTable::from_parts(events, markets), complete);
        summary.inferred_resolved = self.state.write(|table| self.infer_resolutions(table));

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.state.snapshot()) {
                warn!(error = %e, "Failed to persist snapshot after refresh");
            }
        }

        info!(
            pages = summary.pages,
            events = summary.events,
            markets = summary.markets,
            dropped = summary.dropped,
            inferred_resolved = summary.inferred_resolved,
            "Markets refreshed"
        );
        Ok(summary)
    }

    /// Resolve closed markets whose leading outcome is priced past the
    /// win threshold.
    fn infer_resolutions(&self, table: &mut MarketTable) -> usize {
        let decided: Vec<(MarketId, String)> = table
            .markets()
            .filter(|m| m.status == MarketStatus::Closed)
            .filter_map(|m| {
                m.leading_outcome(self.win_threshold)
                    .map(|winner| (m.id.clone(), winner.label.clone()))
            })
            .collect();

        decided
            .into_iter()
            .filter_map(|(market_id, label)| table.resolve(&market_id, Some(label)))
            .count()
    }
}
