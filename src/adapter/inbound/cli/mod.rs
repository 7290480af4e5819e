//! CLI module graph.

pub mod command;
pub mod markets;
pub mod output;
pub mod refresh;
pub mod run;
pub mod winners;
