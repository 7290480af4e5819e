//! Outbound request port used by the dispatcher.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DispatchError;

/// What to call upstream: a GET when `body` is empty, a JSON POST otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    url: String,
    body: Option<Value>,
}

impl Target {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            None => write!(f, "GET {}", self.url),
            Some(body) => match body.get("method").and_then(Value::as_str) {
                Some(method) => write!(f, "POST {} ({method})", self.url),
                None => write!(f, "POST {}", self.url),
            },
        }
    }
}

/// A single upstream call, classified into the dispatcher's failure taxonomy.
///
/// Implementations perform exactly one attempt; retrying and spacing are the
/// dispatcher's job.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    async fn call(&self, target: &Target) -> Result<Value, DispatchError>;
}

#[async_trait]
impl<U: Upstream + ?Sized> Upstream for Arc<U> {
    async fn call(&self, target: &Target) -> Result<Value, DispatchError> {
        (**self).call(target).await
    }
}
