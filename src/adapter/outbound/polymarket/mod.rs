//! Polymarket integration: Gamma market data and the market WebSocket channel.

pub mod codec;
pub mod dto;
pub mod gamma;
pub mod stream;

pub use codec::PolymarketCodec;
pub use gamma::GammaClient;
pub use stream::WebSocketTransport;
