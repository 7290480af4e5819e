//! Polymarket WebSocket transport.
//!
//! Implements [`PushTransport`] over tokio-tungstenite. Protocol pings are
//! answered with pongs, and a text `PING` heartbeat is sent periodically as
//! the market channel expects; its `PONG` replies are passed through and
//! ignored by the codec.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::port::PushTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

enum Inbound {
    Frame(Option<std::result::Result<Message, tungstenite::Error>>),
    Heartbeat,
}

pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
    ws: Option<WsStream>,
    heartbeat: Option<Interval>,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            ws: None,
            heartbeat: None,
        }
    }

    fn stream(&mut self) -> Result<&mut WsStream> {
        self.ws
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".into()))
    }
}

fn heartbeat() -> Interval {
    let mut interval = time::interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<()> {
        self.close().await;
        info!(url = %self.url, "Connecting to WebSocket");

        let (ws, response) = time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::Connection(format!("handshake timed out: {}", self.url)))??;

        info!(status = %response.status(), "WebSocket connected");
        self.ws = Some(ws);
        self.heartbeat = Some(heartbeat());
        Ok(())
    }

    async fn send(&mut self, message: String) -> Result<()> {
        self.stream()?.send(Message::Text(message)).await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        loop {
            let inbound = {
                let ws = self.ws.as_mut()?;
                let ticker = self.heartbeat.get_or_insert_with(heartbeat);
                tokio::select! {
                    frame = ws.next() => Inbound::Frame(frame),
                    _ = ticker.tick() => Inbound::Heartbeat,
                }
            };

            match inbound {
                Inbound::Heartbeat => {
                    trace!("Sending heartbeat");
                    if let Err(e) = self.send("PING".to_string()).await {
                        return Some(Err(e));
                    }
                }
                Inbound::Frame(Some(Ok(Message::Text(text)))) => {
                    trace!(bytes = text.len(), "Received text frame");
                    return Some(Ok(text));
                }
                Inbound::Frame(Some(Ok(Message::Ping(payload)))) => {
                    if let Err(e) = self.stream().ok()?.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Inbound::Frame(Some(Ok(Message::Close(frame)))) => {
                    info!(reason = ?frame, "WebSocket closed by server");
                    self.ws = None;
                    return None;
                }
                Inbound::Frame(Some(Ok(_))) => {}
                Inbound::Frame(Some(Err(e))) => {
                    self.ws = None;
                    return Some(Err(e.into()));
                }
                Inbound::Frame(None) => {
                    debug!("WebSocket stream ended");
                    self.ws = None;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "Error while closing WebSocket");
            }
        }
    }
}
