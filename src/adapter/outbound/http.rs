//! HTTP implementation of the [`Upstream`] port.
//!
//! Performs exactly one attempt per call and maps every outcome onto the
//! dispatcher's failure taxonomy. JSON-RPC error objects in POST responses
//! are classified as well, since RPC providers report rate limiting with a
//! 200 status.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::infrastructure::config::dispatch::DispatchConfig;
use crate::port::{Target, Upstream};

/// JSON-RPC code used by RPC providers for "limit exceeded".
const RPC_LIMIT_EXCEEDED: i64 = -32005;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

pub struct HttpUpstream {
    http: HttpClient,
}

impl HttpUpstream {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: HttpClient::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self { http }
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, target: &Target) -> Result<Value, DispatchError> {
        let label = target.to_string();
        let request = match target.body() {
            None => self.http.get(target.url()),
            Some(body) => self.http.post(target.url()).json(body),
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(&label, &e))?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DispatchError::RateLimited { target: label });
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_transport(&label, &e))?;
        if !status.is_success() {
            return Err(DispatchError::Upstream {
                target: label,
                status: Some(status.as_u16()),
                message: truncate(&text),
            });
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| DispatchError::Malformed {
            target: label.clone(),
            reason: e.to_string(),
        })?;

        if target.body().is_some() {
            if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
                return Err(classify_rpc_error(&label, error));
            }
        }

        debug!(endpoint = %label, status = status.as_u16(), "Upstream call succeeded");
        Ok(value)
    }
}

/// Classify a JSON-RPC `error` object.
pub fn classify_rpc_error(target: &str, error: &Value) -> DispatchError {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_string);

    let lowered = message.to_ascii_lowercase();
    let rate_limited = code == Some(RPC_LIMIT_EXCEEDED)
        || code == Some(429)
        || lowered.contains("rate limit")
        || lowered.contains("too many requests");

    if rate_limited {
        DispatchError::RateLimited {
            target: target.to_string(),
        }
    } else {
        DispatchError::Upstream {
            target: target.to_string(),
            status: None,
            message: truncate(&message),
        }
    }
}

fn classify_transport(target: &str, err: &reqwest::Error) -> DispatchError {
    let target = target.to_string();
    if err.is_timeout() {
        DispatchError::Timeout { target }
    } else if err.is_connect() || is_reset(err) {
        DispatchError::ConnectionReset { target }
    } else if err.is_decode() || err.is_body() {
        DispatchError::Malformed {
            target,
            reason: err.to_string(),
        }
    } else {
        DispatchError::Upstream {
            target,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Whether an io error somewhere in the source chain is a dropped connection.
fn is_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = inner.source();
    }
    false
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}...")
    }
}
