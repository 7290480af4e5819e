//! Plain terminal output helpers shared by command handlers.

use serde::Serialize;

use crate::error::Result;

/// Print `value` as one line of JSON.
#[allow(clippy::result_large_err)]
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print an aligned `label: value` line.
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<16} {value}");
}

pub fn header(title: &str) {
    println!("{title}");
}
