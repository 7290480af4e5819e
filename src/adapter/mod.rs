//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - the command-line interface
//! - [`outbound`] - HTTP, JSON-RPC, WebSocket and file adapters

pub mod inbound;
pub mod outbound;
