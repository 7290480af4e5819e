//! Test doubles and builders shared by unit and integration tests.
//!
//! Compiled under `cfg(test)` or with the `testkit` feature.

pub mod chain;
pub mod domain;
pub mod market;
pub mod rpc;
pub mod store;
pub mod stream;
pub mod subscriber;
pub mod upstream;
