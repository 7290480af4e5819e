//! Application configuration loading and validation.
//!
//! [`Config`] aggregates every section of the TOML file. Each field carries a
//! serde default, so an empty file is a valid configuration. Endpoints can be
//! overridden from the environment (`SETTLER_RPC_URL`, `SETTLER_WS_URL`,
//! `SETTLER_SNAPSHOT_PATH`).
//!
//! # Example
//!
//! ```no_run
//! use settler::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::api::ApiConfig;
use super::chain::ChainConfig;
use super::dispatch::DispatchConfig;
use super::logging::LoggingConfig;
use super::stream::StreamConfig;
use crate::error::{ConfigError, Result};

/// How a market's winning outcome is inferred from prices.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    /// An outcome priced strictly above this is taken as the winner.
    #[serde(default = "default_win_threshold")]
    pub win_threshold: Decimal,
}

fn default_win_threshold() -> Decimal {
    Decimal::new(9, 1)
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            win_threshold: default_win_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("settler-snapshot.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Periodic full refresh while `run` is active.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_interval_secs() -> u64 {
    300
}

impl RefreshConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Config {
    /// Parse configuration from TOML, apply environment overrides and validate.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load from `path` when it exists, otherwise start from defaults.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("SETTLER_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Some(url) = non_empty_env("SETTLER_WS_URL") {
            self.stream.ws_url = url;
        }
        if let Some(path) = non_empty_env("SETTLER_SNAPSHOT_PATH") {
            self.storage.snapshot_path = PathBuf::from(path);
        }
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.api.gamma_url.is_empty() {
            return Err(ConfigError::MissingField { field: "gamma_url" }.into());
        }
        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::MissingField { field: "rpc_url" }.into());
        }
        if self.stream.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.chain.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.chain.ctf_address.parse::<Address>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "ctf_address",
                reason: "must be a 20-byte hex address".to_string(),
            }
            .into());
        }
        if self.stream.base_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "base_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        let threshold = self.resolution.win_threshold;
        if threshold < Decimal::ZERO || threshold >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "win_threshold",
                reason: "must be in [0, 1)".to_string(),
            }
            .into());
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize the global tracing subscriber.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::infrastructure::config::chain::CTF_DEPLOYMENT_BLOCK;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.stream.base_delay_ms, 5_000);
        assert_eq!(config.stream.max_attempts, 10);
        assert_eq!(config.chain.window_size, 5_000);
        assert_eq!(config.chain.start_block, CTF_DEPLOYMENT_BLOCK);
        assert_eq!(config.resolution.win_threshold, Decimal::new(9, 1));
        assert_eq!(config.refresh.interval(), Duration::from_secs(300));
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            [dispatch]
            min_spacing_ms = 100
            max_retries = 5

            [chain]
            window_size = 2000
            start_block = 50000000

            [resolution]
            win_threshold = "0.95"
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.dispatch.min_spacing(), Duration::from_millis(100));
        assert_eq!(config.dispatch.max_retries, 5);
        assert_eq!(config.dispatch.retry_delay_ms, 2_000);
        assert_eq!(config.chain.window_size, 2_000);
        assert_eq!(config.chain.start_block, 50_000_000);
        assert_eq!(config.resolution.win_threshold, Decimal::new(95, 2));
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let err = Config::parse_toml("[chain]\nwindow_size = 0").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "window_size",
                ..
            })
        ));
    }

    #[test]
    fn threshold_of_one_is_rejected() {
        let err = Config::parse_toml("[resolution]\nwin_threshold = \"1.0\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "win_threshold",
                ..
            })
        ));
    }

    #[test]
    fn bad_contract_address_is_rejected() {
        let err = Config::parse_toml("[chain]\nctf_address = \"0x1234\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "ctf_address",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[dispatch\nmax_retries = 1").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load("/nonexistent/settler.toml").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
    }
}
