//! Snapshot persistence port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Event, Market, WinnerRecord};
use crate::error::StoreError;

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub winners: Vec<WinnerRecord>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Load-at-startup, save-after-mutation storage.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot; an absent snapshot is empty.
    fn load(&self) -> Result<Snapshot, StoreError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
