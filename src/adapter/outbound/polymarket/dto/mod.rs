//! Polymarket wire types.

pub mod message;
pub mod response;
