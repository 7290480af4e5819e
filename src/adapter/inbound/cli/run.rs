//! Handler for the `run` command.
//!
//! Loads the snapshot, refreshes once, then streams updates until Ctrl-C or
//! until the channel gives up. Resolutions from the stream are settled in a
//! separate task so slow reconstructions never stall delivery.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapter::outbound::chain::CtfTransferSource;
use crate::application::{
    ChannelState, MarketRefresher, MarketState, SettlementService, SubscriberSet,
};
use crate::domain::{DomainEvent, MarketId};
use crate::error::{DeliveryError, Error, Result};
use crate::infrastructure::bootstrap::{self, Components};
use crate::infrastructure::config::settings::Config;
use crate::port::{LogSubscriber, MarketSource, SnapshotStore, Subscriber};

/// Execute the run command.
pub async fn execute(config: &Config) -> Result<()> {
    let components = Components::build(config)?;
    let refresher = bootstrap::build_refresher(config, &components);
    refresh(&refresher).await;

    let subscribers = Arc::new(SubscriberSet::new());
    subscribers.subscribe(Arc::new(LogSubscriber));
    let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
    subscribers.subscribe(Arc::new(ResolutionForwarder { tx: resolved_tx }));

    let settlement = bootstrap::build_settlement(config, &components)?;
    let channel = bootstrap::build_channel(config, &components, Arc::clone(&subscribers));

    let cancel = CancellationToken::new();
    let mut channel_task = tokio::spawn(channel.run(cancel.child_token()));
    let settle_task = tokio::spawn(settle_resolved(
        settlement,
        Arc::clone(&components.state),
        Arc::clone(&components.store),
        resolved_rx,
        cancel.child_token(),
    ));
    let refresh_task = tokio::spawn(refresh_periodically(
        refresher,
        config.refresh.interval(),
        cancel.child_token(),
    ));

    let finished = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            None
        }
        joined = &mut channel_task => Some(joined.unwrap_or(ChannelState::Stopped)),
    };
    cancel.cancel();
    let final_state = match finished {
        Some(state) => state,
        None => channel_task.await.unwrap_or(ChannelState::Stopped),
    };

    let _ = refresh_task.await;
    let _ = settle_task.await;
    if let Err(e) = components.store.save(&components.state.snapshot()) {
        warn!(error = %e, "Final snapshot save failed");
    }

    if final_state == ChannelState::GivenUp {
        error!("Streaming channel gave up reconnecting");
        return Err(Error::Connection(
            "streaming channel gave up reconnecting".into(),
        ));
    }
    info!("settler stopped");
    Ok(())
}

async fn refresh<M: MarketSource>(refresher: &MarketRefresher<M>) {
    match refresher.refresh().await {
        Ok(summary) => info!(
            events = summary.events,
            markets = summary.markets,
            dropped = summary.dropped,
            "Market refresh complete"
        ),
        Err(e) => warn!(error = %e, "Market refresh failed, keeping current state"),
    }
}

/// Refresh on every tick until cancelled.
///
/// Runs beside the shutdown wait so a slow refresh never delays Ctrl-C or
/// the channel giving up. A refresh in flight is abandoned on cancellation.
async fn refresh_periodically<M: MarketSource>(
    refresher: MarketRefresher<M>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Refresh abandoned on shutdown");
                break;
            }
            () = refresh(&refresher) => {}
        }
    }
}

/// Forwards resolved market ids to the settlement task.
struct ResolutionForwarder {
    tx: mpsc::UnboundedSender<MarketId>,
}

impl Subscriber for ResolutionForwarder {
    fn deliver(&self, event: &DomainEvent) -> std::result::Result<(), DeliveryError> {
        if let DomainEvent::MarketResolved { market_id, .. } = event {
            self.tx
                .send(market_id.clone())
                .map_err(|_| DeliveryError::Closed)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "settlement"
    }
}

async fn settle_resolved(
    settlement: SettlementService<CtfTransferSource>,
    state: Arc<MarketState>,
    store: Arc<dyn SnapshotStore>,
    mut resolved: mpsc::UnboundedReceiver<MarketId>,
    cancel: CancellationToken,
) {
    loop {
        let market_id = tokio::select! {
            () = cancel.cancelled() => break,
            next = resolved.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        let outcome = tokio::select! {
            () = cancel.cancelled() => break,
            outcome = settlement.winners_for_market(&market_id, None, None) => outcome,
        };
        match outcome {
            Ok(record) => {
                info!(
                    market_id = %market_id,
                    holders = record.winner_count,
                    total_payout = %record.total_payout,
                    "Market settled"
                );
                if let Err(e) = store.save(&state.snapshot()) {
                    warn!(market_id = %market_id, error = %e, "Snapshot save failed");
                }
            }
            Err(e) => warn!(market_id = %market_id, error = %e, "Settlement failed"),
        }
    }
}
