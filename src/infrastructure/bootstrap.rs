//! Composition root: builds runtime components from [`Config`].

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tracing::info;

use crate::adapter::outbound::chain::CtfTransferSource;
use crate::adapter::outbound::http::HttpUpstream;
use crate::adapter::outbound::polymarket::{GammaClient, PolymarketCodec, WebSocketTransport};
use crate::adapter::outbound::store::JsonFileStore;
use crate::application::{
    Backoff, BalanceReconstructor, DispatchPolicy, MarketRefresher, MarketState,
    RequestDispatcher, SettlementService, SubscriberSet, UpdateChannel,
};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::SnapshotStore;

/// Shared handles every command starts from.
pub struct Components {
    pub dispatcher: RequestDispatcher,
    pub store: Arc<dyn SnapshotStore>,
    pub state: Arc<MarketState>,
}

impl Components {
    /// Start the dispatcher worker and restore state from the snapshot.
    ///
    /// Must be called inside a tokio runtime.
    #[allow(clippy::result_large_err)]
    pub fn build(config: &Config) -> Result<Self> {
        let dispatcher = build_dispatcher(config);
        let store: Arc<dyn SnapshotStore> =
            Arc::new(JsonFileStore::new(config.storage.snapshot_path.clone()));
        let snapshot = store.load()?;
        info!(
            path = %config.storage.snapshot_path.display(),
            markets = snapshot.markets.len(),
            winners = snapshot.winners.len(),
            "Snapshot loaded"
        );
        let state = Arc::new(MarketState::from_snapshot(snapshot));
        Ok(Self {
            dispatcher,
            store,
            state,
        })
    }
}

#[must_use]
pub const fn dispatch_policy(config: &Config) -> DispatchPolicy {
    DispatchPolicy {
        min_spacing: config.dispatch.min_spacing(),
        max_retries: config.dispatch.max_retries,
        retry_delay: config.dispatch.retry_delay(),
    }
}

/// Spawn the single dispatcher worker over HTTP.
pub fn build_dispatcher(config: &Config) -> RequestDispatcher {
    let upstream = HttpUpstream::from_config(&config.dispatch);
    RequestDispatcher::spawn(upstream, dispatch_policy(config))
}

pub fn build_refresher(config: &Config, components: &Components) -> MarketRefresher<GammaClient> {
    let client = GammaClient::new(components.dispatcher.clone(), config.api.gamma_url.clone())
        .with_include_closed(config.api.include_closed);
    MarketRefresher::new(
        client,
        Arc::clone(&components.state),
        config.api.page_size,
        config.api.max_pages,
    )
    .with_store(Arc::clone(&components.store))
    .with_win_threshold(config.resolution.win_threshold)
}

#[allow(clippy::result_large_err)]
pub fn build_settlement(
    config: &Config,
    components: &Components,
) -> Result<SettlementService<CtfTransferSource>> {
    let contract =
        Address::from_str(&config.chain.ctf_address).map_err(|e| ConfigError::InvalidValue {
            field: "chain.ctf_address",
            reason: e.to_string(),
        })?;
    let source = CtfTransferSource::new(
        components.dispatcher.clone(),
        config.chain.rpc_url.clone(),
        contract,
    );
    let reconstructor = BalanceReconstructor::new(source, config.chain.window_size)
        .with_start_sequence(config.chain.start_block);
    Ok(SettlementService::new(
        reconstructor,
        Arc::clone(&components.state),
        config.resolution.win_threshold,
    ))
}

pub fn build_channel(
    config: &Config,
    components: &Components,
    subscribers: Arc<SubscriberSet>,
) -> UpdateChannel<WebSocketTransport> {
    let transport = WebSocketTransport::new(
        config.stream.ws_url.clone(),
        Duration::from_millis(config.stream.connect_timeout_ms),
    );
    let backoff = Backoff::new(
        Duration::from_millis(config.stream.base_delay_ms),
        config.stream.max_attempts,
    );
    UpdateChannel::new(
        transport,
        Arc::new(PolymarketCodec),
        Arc::clone(&components.state),
        subscribers,
        backoff,
    )
    .with_store(Arc::clone(&components.store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.storage.snapshot_path = dir.path().join("snapshot.json");
        config
    }

    #[test]
    fn policy_follows_dispatch_section() {
        let config = Config::parse_toml(
            "[dispatch]\nmin_spacing_ms = 100\nmax_retries = 5\nretry_delay_ms = 40\n",
        )
        .unwrap();

        let policy = dispatch_policy(&config);

        assert_eq!(policy.min_spacing, Duration::from_millis(100));
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.retry_delay, Duration::from_millis(40));
    }

    #[tokio::test]
    async fn components_start_empty_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let components = Components::build(&config).unwrap();

        assert!(components.dispatcher.is_running());
        assert_eq!(components.state.read(|t| t.market_count()), 0);
        assert!(build_settlement(&config, &components).is_ok());
    }

    #[tokio::test]
    async fn bad_contract_address_is_rejected_at_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        let components = Components::build(&config).unwrap();
        config.chain.ctf_address = "not-an-address".into();

        let err = build_settlement(&config, &components).err().unwrap();

        assert!(err.to_string().contains("chain.ctf_address"));
    }
}
