//! Streaming update channel.
//!
//! One persistent push connection driven by a single control loop:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> ...
//!                                    \-> GivenUp (attempts exhausted)
//!                                    \-> Stopped (cancelled)
//! ```
//!
//! A successful handshake resets the attempt counter and sends the
//! subscription for every active market's outcome tokens. Any close or
//! transport error schedules a reconnect after `base_delay * 2^(attempt-1)`;
//! once the attempt counter exceeds `max_attempts` the channel gives up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fanout::SubscriberSet;
use super::state::MarketState;
use crate::domain::{DomainEvent, MarketId, PositionId};
use crate::error::Result;
use crate::port::{PushTransport, SnapshotStore, StreamCodec, StreamUpdate};

/// Connection state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts exhausted; terminal.
    GivenUp,
    /// Cancelled by the owner; terminal.
    Stopped,
}

impl ChannelState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GivenUp | Self::Stopped)
    }
}

/// Exponential reconnect schedule with an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Count one more attempt and return its delay, or `None` once the
    /// attempt counter exceeds the cap.
    pub fn schedule(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        (self.attempt <= self.max_attempts).then(|| self.delay_for(self.attempt))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// The streaming channel. Consumed by [`UpdateChannel::run`].
pub struct UpdateChannel<T> {
    transport: T,
    codec: Arc<dyn StreamCodec>,
    state: Arc<MarketState>,
    subscribers: Arc<SubscriberSet>,
    store: Option<Arc<dyn SnapshotStore>>,
    backoff: Backoff,
    status: watch::Sender<ChannelState>,
}

impl<T: PushTransport> UpdateChannel<T> {
    pub fn new(
        transport: T,
        codec: Arc<dyn StreamCodec>,
        state: Arc<MarketState>,
        subscribers: Arc<SubscriberSet>,
        backoff: Backoff,
    ) -> Self {
        let (status, _) = watch::channel(ChannelState::Disconnected);
        Self {
            transport,
            codec,
            state,
            subscribers,
            store: None,
            backoff,
            status,
        }
    }

    /// Persist a snapshot through `store` after every resolution.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Observe state transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ChannelState> {
        self.status.subscribe()
    }

    /// Run until cancelled or until reconnect attempts are exhausted.
    ///
    /// Returns the terminal state.
    pub async fn run(mut self, cancel: CancellationToken) -> ChannelState {
        loop {
            self.set_state(ChannelState::Connecting);
            let connected = tokio::select! {
                _ = cancel.cancelled() => None,
                result = self.transport.connect() => Some(result),
            };
            let Some(connected) = connected else {
                return self.stop().await;
            };

            match connected {
                Ok(()) => {
                    self.backoff.reset();
                    self.set_state(ChannelState::Connected);
                    info!("Stream connected");

                    let session = tokio::select! {
                        _ = cancel.cancelled() => None,
                        reason = self.session() => Some(reason),
                    };
                    let Some(reason) = session else {
                        return self.stop().await;
                    };
                    warn!(reason = %reason, "Stream disconnected");
                    self.transport.close().await;
                }
                Err(e) => warn!(error = %e, "Stream connection failed"),
            }

            self.set_state(ChannelState::Disconnected);
            let Some(delay) = self.backoff.schedule() else {
                error!(
                    attempts = self.backoff.attempt() - 1,
                    "Reconnect attempts exhausted, giving up"
                );
                self.set_state(ChannelState::GivenUp);
                return ChannelState::GivenUp;
            };
            info!(
                attempt = self.backoff.attempt(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnect scheduled"
            );

            let waited = tokio::select! {
                _ = cancel.cancelled() => false,
                () = tokio::time::sleep(delay) => true,
            };
            if !waited {
                return self.stop().await;
            }
        }
    }

    /// Subscribe and pump frames until the connection ends. Returns why.
    async fn session(&mut self) -> String {
        if let Err(e) = self.subscribe().await {
            return format!("subscription failed: {e}");
        }
        loop {
            match self.transport.next_message().await {
                Some(Ok(frame)) => self.handle_frame(&frame),
                Some(Err(e)) => return e.to_string(),
                None => return "closed by peer".to_string(),
            }
        }
    }

    async fn subscribe(&mut self) -> Result<()> {
        let assets = self.state.read(|t| t.active_position_ids());
        if assets.is_empty() {
            debug!("No active markets to subscribe to");
            return Ok(());
        }
        let request = self.codec.subscribe_request(&assets)?;
        self.transport.send(request).await?;
        info!(assets = assets.len(), "Subscribed to market updates");
        Ok(())
    }

    fn handle_frame(&self, frame: &str) {
        let updates = match self.codec.decode(frame) {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Dropping unparseable stream message");
                return;
            }
        };
        for update in updates {
            self.apply(update);
        }
    }

    fn apply(&self, update: StreamUpdate) {
        match update {
            StreamUpdate::Price { position_id, price } => {
                let change = self.state.write(|t| t.update_price(&position_id, price));
                match change {
                    Some(change) => {
                        self.subscribers.broadcast(&DomainEvent::from(change));
                    }
                    None => debug!(position_id = %position_id, "Price for untracked asset"),
                }
            }
            StreamUpdate::Resolved {
                market_id,
                winning_position,
                winning_outcome,
            } => self.resolve(&market_id, winning_position.as_ref(), winning_outcome),
        }
    }

    fn resolve(
        &self,
        market_id: &MarketId,
        winning_position: Option<&PositionId>,
        winning_outcome: Option<String>,
    ) {
        let resolution = self.state.write(|t| {
            let label = winning_outcome.or_else(|| {
                let market = t.market(market_id)?;
                let outcome = market.outcome_by_position(winning_position?)?;
                Some(outcome.label.clone())
            });
            t.resolve(market_id, label)
        });
        let Some(resolution) = resolution else {
            debug!(market_id = %market_id, "Resolution for unknown or already resolved market");
            return;
        };

        info!(
            market_id = %resolution.market_id,
            event_id = %resolution.event_id,
            winner = resolution.winning_outcome.as_deref().unwrap_or("unknown"),
            "Market resolved"
        );
        self.persist();
        self.subscribers.broadcast(&DomainEvent::from(resolution));
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.state.snapshot()) {
                warn!(error = %e, "Failed to persist snapshot");
            }
        }
    }

    async fn stop(&mut self) -> ChannelState {
        self.transport.close().await;
        self.set_state(ChannelState::Stopped);
        info!("Stream stopped");
        ChannelState::Stopped
    }

    fn set_state(&self, state: ChannelState) {
        let previous = self.status.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Channel state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketStatus;
    use crate::error::{DeliveryError, Error};
    use crate::testkit::domain::{market_id, sample_table};
    use crate::testkit::store::MemoryStore;
    use crate::testkit::stream::{LineCodec, ScriptedTransport};
    use crate::testkit::subscriber::{FailingSubscriber, RecordingSubscriber};
    use rust_decimal::Decimal;
    use tokio::time::Instant;

    fn state() -> Arc<MarketState> {
        let state = MarketState::new();
        state.replace(sample_table());
        Arc::new(state)
    }

    fn channel(
        transport: ScriptedTransport,
        state: Arc<MarketState>,
        subscribers: Arc<SubscriberSet>,
        max_attempts: u32,
    ) -> UpdateChannel<ScriptedTransport> {
        UpdateChannel::new(
            transport,
            Arc::new(LineCodec),
            state,
            subscribers,
            Backoff::new(Duration::from_millis(5_000), max_attempts),
        )
    }

    // -------------------------------------------------------------------------
    // Backoff
    // -------------------------------------------------------------------------

    #[test]
    fn backoff_doubles_from_base() {
        let mut backoff = Backoff::new(Duration::from_millis(5_000), 10);
        assert_eq!(backoff.schedule(), Some(Duration::from_millis(5_000)));
        assert_eq!(backoff.schedule(), Some(Duration::from_millis(10_000)));
        assert_eq!(backoff.schedule(), Some(Duration::from_millis(20_000)));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn backoff_gives_up_past_max_attempts() {
        let mut backoff = Backoff::new(Duration::from_millis(100), 2);
        assert!(backoff.schedule().is_some());
        assert!(backoff.schedule().is_some());
        assert_eq!(backoff.schedule(), None);
    }

    #[test]
    fn backoff_reset_restarts_at_base() {
        let mut backoff = Backoff::new(Duration::from_millis(100), 5);
        backoff.schedule();
        backoff.schedule();
        backoff.reset();
        assert_eq!(backoff.schedule(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let backoff = Backoff::new(Duration::from_secs(5), 100);
        assert_eq!(backoff.delay_for(64), Duration::from_secs(5).saturating_mul(u32::MAX));
    }

    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = ScriptedTransport::new().failing_connects();
        let connects = transport.connect_count();
        let channel = channel(transport, state(), Arc::new(SubscriberSet::new()), 3);
        let watch = channel.watch();

        let started = Instant::now();
        let end = channel.run(CancellationToken::new()).await;

        assert_eq!(end, ChannelState::GivenUp);
        assert_eq!(*watch.borrow(), ChannelState::GivenUp);
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(35_000));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_connect_resets_attempts() {
        let transport = ScriptedTransport::new().with_frames(vec![None, None, None]);
        let connects = transport.connect_count();
        let channel = channel(transport, state(), Arc::new(SubscriberSet::new()), 1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(15_001)).await;
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 4);

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), ChannelState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_without_reconnecting() {
        let transport = ScriptedTransport::new().failing_connects();
        let connects = transport.connect_count();
        let channel = channel(transport, state(), Arc::new(SubscriberSet::new()), 10);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), ChannelState::Stopped);
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn subscribes_to_active_assets_on_connect() {
        let transport = ScriptedTransport::new();
        let sent = transport.sent();
        let channel = channel(transport, state(), Arc::new(SubscriberSet::new()), 3);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(*sent.lock(), vec!["subscribe 11,12,21,22".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn price_and_resolution_reach_subscribers_and_state() {
        let transport = ScriptedTransport::new().with_frames(vec![
            Some(Ok("price 11 0.97".into())),
            Some(Ok("not a message".into())),
            Some(Ok("resolved m1 pos:11".into())),
        ]);
        let closes = transport.close_count();
        let state = state();
        let store = Arc::new(MemoryStore::new());
        let subscribers = Arc::new(SubscriberSet::new());
        let (_, mut rx) = subscribers.channel(8);
        let channel = channel(transport, state.clone(), subscribers, 3).with_store(store.clone());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), ChannelState::Stopped);

        match first {
            DomainEvent::PriceUpdate {
                market_id: m,
                outcome_label,
                price,
                ..
            } => {
                assert_eq!(m, market_id("m1"));
                assert_eq!(outcome_label, "Yes");
                assert_eq!(price, Decimal::new(97, 2));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match second {
            DomainEvent::MarketResolved {
                market_id: m,
                winning_outcome,
                active_markets,
                resolved_markets,
                ..
            } => {
                assert_eq!(m, market_id("m1"));
                assert_eq!(winning_outcome.as_deref(), Some("Yes"));
                assert_eq!((active_markets, resolved_markets), (1, 1));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        state.read(|t| {
            let market = t.market(&market_id("m1")).unwrap();
            assert_eq!(
                market.status,
                MarketStatus::Resolved {
                    winning_outcome: Some("Yes".into())
                }
            );
        });
        let saved = store.last_saved().unwrap();
        assert!(saved.markets.iter().any(|m| m.id == market_id("m1") && m.is_resolved()));
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_subscriber_is_dropped_while_others_keep_receiving() {
        let transport = ScriptedTransport::new().with_frames(vec![
            Some(Ok("price 11 0.6".into())),
            Some(Ok("price 21 0.4".into())),
        ]);
        let subscribers = Arc::new(SubscriberSet::new());
        let failing = Arc::new(FailingSubscriber::new(DeliveryError::Closed));
        let recorder = Arc::new(RecordingSubscriber::new());
        subscribers.subscribe(failing.clone());
        subscribers.subscribe(recorder.clone());
        let (_, mut rx) = subscribers.channel(8);
        let channel = channel(transport, state(), subscribers.clone(), 3);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(failing.attempts(), 1);
        assert_eq!(recorder.events_of("price_update").len(), 2);
        assert_eq!(subscribers.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_triggers_reconnect() {
        let transport = ScriptedTransport::new().with_frames(vec![Some(Err(Error::Connection(
            "reset".into(),
        )))]);
        let connects = transport.connect_count();
        let channel = channel(transport, state(), Arc::new(SubscriberSet::new()), 3);
        let watch = channel.watch();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(*watch.borrow(), ChannelState::Disconnected);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(*watch.borrow(), ChannelState::Connected);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_of_unknown_market_is_ignored() {
        let transport =
            ScriptedTransport::new().with_frames(vec![Some(Ok("resolved nope Yes".into()))]);
        let subscribers = Arc::new(SubscriberSet::new());
        let recorder = Arc::new(RecordingSubscriber::new());
        subscribers.subscribe(recorder.clone());
        let channel = channel(transport, state(), subscribers, 3);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(recorder.events().is_empty());
    }
}
