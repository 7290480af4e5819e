//! Outbound ports: what the core needs from the outside world.

pub mod codec;
pub mod market;
pub mod store;
pub mod subscriber;
pub mod transfer;
pub mod transport;
pub mod upstream;
