//! Push-message transport port.

use async_trait::async_trait;

use crate::error::Result;

/// A persistent push connection carrying text frames.
#[async_trait]
pub trait PushTransport: Send {
    /// Open the connection (handshake included).
    async fn connect(&mut self) -> Result<()>;

    async fn send(&mut self, message: String) -> Result<()>;

    /// Next inbound text frame.
    ///
    /// `None` once the connection is closed; `Some(Err(_))` on a transport
    /// error. Either ends the connection.
    async fn next_message(&mut self) -> Option<Result<String>>;

    /// Close the connection if open.
    async fn close(&mut self);
}
