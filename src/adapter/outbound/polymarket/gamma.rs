//! Gamma API market source.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::dto::response::GammaEvent;
use crate::application::RequestDispatcher;
use crate::error::DispatchError;
use crate::port::{MarketPage, MarketSource, Target};

/// Pages through `GET {base}/events` via the dispatcher.
pub struct GammaClient {
    dispatcher: RequestDispatcher,
    base_url: String,
    include_closed: bool,
}

impl GammaClient {
    pub fn new(dispatcher: RequestDispatcher, base_url: impl Into<String>) -> Self {
        Self {
            dispatcher,
            base_url: base_url.into(),
            include_closed: false,
        }
    }

    /// Also list closed events, so resolutions missed while offline are seen.
    #[must_use]
    pub const fn with_include_closed(mut self, include_closed: bool) -> Self {
        self.include_closed = include_closed;
        self
    }

    fn events_url(&self, offset: usize, limit: usize) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}/events", self.base_url.trim_end_matches('/')))?;
        {
            let mut query = url.query_pairs_mut();
            if !self.include_closed {
                query.append_pair("active", "true");
                query.append_pair("closed", "false");
            }
            query.append_pair("limit", &limit.to_string());
            query.append_pair("offset", &offset.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl MarketSource for GammaClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<MarketPage, DispatchError> {
        let url = self
            .events_url(offset, limit)
            .map_err(|e| DispatchError::Malformed {
                target: self.base_url.clone(),
                reason: e.to_string(),
            })?;
        let target = Target::get(url.as_str());
        let label = target.to_string();

        match self.dispatcher.dispatch(target).await? {
            Value::Array(records) => Ok(parse_events(records)),
            other => Err(DispatchError::Malformed {
                target: label,
                reason: format!("expected an array of events, got {}", kind(&other)),
            }),
        }
    }
}

/// Parse event records one by one, dropping the ones that fail.
pub fn parse_events(records: Vec<Value>) -> MarketPage {
    let mut page = MarketPage {
        raw_count: records.len(),
        ..MarketPage::default()
    };
    for record in records {
        match serde_json::from_value::<GammaEvent>(record) {
            Ok(event) => {
                let (event, markets) = event.into_domain();
                page.events.push(event);
                page.markets.extend(markets);
            }
            Err(e) => warn!(error = %e, "Dropping unparseable event"),
        }
    }
    page
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
