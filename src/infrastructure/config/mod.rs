//! Infrastructure configuration modules.

pub mod api;
pub mod chain;
pub mod dispatch;
pub mod logging;
pub mod settings;
pub mod stream;
