//! Outbound request dispatcher configuration.

use std::time::Duration;

use serde::Deserialize;

/// Spacing, retry and timeout settings shared by every outbound call.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Minimum gap between two dispatches (milliseconds).
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
    /// Retries granted to a request on rate limiting or connection resets.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed wait before a retried request is put back at the queue front (milliseconds).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Per-request timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// TCP connect timeout (milliseconds).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

const fn default_min_spacing_ms() -> u64 {
    250
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    2_000
}

const fn default_timeout_ms() -> u64 {
    15_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl DispatchConfig {
    #[must_use]
    pub const fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: default_min_spacing_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}
