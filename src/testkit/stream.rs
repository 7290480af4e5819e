//! Scripted [`PushTransport`] and a line-based [`StreamCodec`].
//!
//! - [`ScriptedTransport`] pre-loads connect results and inbound frames.
//!   Once the frames run out, `next_message` pends forever, like an idle
//!   connection.
//! - [`LineCodec`] is a plain-text wire format so channel tests read easily:
//!   `price <position> <decimal>`, `resolved <market> <label>` or
//!   `resolved <market> pos:<position>`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{MarketId, PositionId};
use crate::error::{Error, Result};
use crate::port::{PushTransport, StreamCodec, StreamUpdate};

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// A transport with scripted connect results and a fixed frame queue.
///
/// Each `connect()` pops the next result (defaults to `Ok(())` when
/// exhausted, or an error forever with [`failing_connects`](Self::failing_connects)).
/// Each `next_message()` pops the next frame; a `None` frame is a close by
/// the peer.
pub struct ScriptedTransport {
    connect_results: VecDeque<Result<()>>,
    always_fail: bool,
    frames: VecDeque<Option<Result<String>>>,
    connect_count: Arc<AtomicU32>,
    close_count: Arc<AtomicU32>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            always_fail: false,
            frames: VecDeque::new(),
            connect_count: Arc::new(AtomicU32::new(0)),
            close_count: Arc::new(AtomicU32::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    /// Every connect attempt fails.
    pub fn failing_connects(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn with_frames(mut self, frames: Vec<Option<Result<String>>>) -> Self {
        self.frames = frames.into();
        self
    }

    pub fn connect_count(&self) -> Arc<AtomicU32> {
        self.connect_count.clone()
    }

    pub fn close_count(&self) -> Arc<AtomicU32> {
        self.close_count.clone()
    }

    /// Messages sent upstream, e.g. subscription requests.
    pub fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(Error::Connection("scripted connect failure".into()));
        }
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn send(&mut self, message: String) -> Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        match self.frames.pop_front() {
            Some(frame) => frame,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// Whitespace-separated text codec for tests.
pub struct LineCodec;

impl StreamCodec for LineCodec {
    fn subscribe_request(&self, position_ids: &[PositionId]) -> Result<String> {
        let ids: Vec<&str> = position_ids.iter().map(PositionId::as_str).collect();
        Ok(format!("subscribe {}", ids.join(",")))
    }

    fn decode(&self, frame: &str) -> Result<Vec<StreamUpdate>> {
        let parts: Vec<&str> = frame.split_whitespace().collect();
        match parts.as_slice() {
            ["price", position, price] => {
                let price: Decimal = price
                    .parse()
                    .map_err(|e| Error::Parse(format!("bad price: {e}")))?;
                Ok(vec![StreamUpdate::Price {
                    position_id: PositionId::from(*position),
                    price,
                }])
            }
            ["resolved", market, winner] => {
                let update = match winner.strip_prefix("pos:") {
                    Some(position) => StreamUpdate::Resolved {
                        market_id: MarketId::from(*market),
                        winning_position: Some(PositionId::from(position)),
                        winning_outcome: None,
                    },
                    None => StreamUpdate::Resolved {
                        market_id: MarketId::from(*market),
                        winning_position: None,
                        winning_outcome: Some((*winner).to_string()),
                    },
                };
                Ok(vec![update])
            }
            ["ping"] => Ok(vec![]),
            _ => Err(Error::Parse(format!("unrecognized frame: {frame}"))),
        }
    }
}
