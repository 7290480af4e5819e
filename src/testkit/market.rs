//! Paged in-memory [`MarketSource`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::DispatchError;
use crate::port::{MarketPage, MarketSource};

/// Serves pre-built pages by `offset / limit` and records each request.
pub struct PagedMarketSource {
    pages: Vec<MarketPage>,
    fail_page: Option<usize>,
    requests: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl PagedMarketSource {
    pub fn new(pages: Vec<MarketPage>) -> Self {
        Self {
            pages,
            fail_page: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the request for page `index` with an upstream error.
    pub fn failing_page(mut self, index: usize) -> Self {
        self.fail_page = Some(index);
        self
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<(usize, usize)>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl MarketSource for PagedMarketSource {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<MarketPage, DispatchError> {
        self.requests.lock().push((offset, limit));
        let index = offset / limit.max(1);
        if self.fail_page == Some(index) {
            return Err(DispatchError::Upstream {
                target: format!("GET events?offset={offset}"),
                status: Some(502),
                message: "bad gateway".into(),
            });
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}
