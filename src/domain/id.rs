//! Domain identifier types with proper encapsulation.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Market condition identifier (the Gamma `conditionId`).
    MarketId
);

string_id!(
    /// Identifier of the event that groups one or more markets.
    EventId
);

string_id!(
    /// ERC-1155 position id of one outcome token.
    ///
    /// Polymarket publishes these as decimal strings (`clobTokenIds`); the
    /// on-chain representation is a `uint256`.
    PositionId
);

impl PositionId {
    /// Parse the on-chain token id. Accepts decimal or `0x`-prefixed hex.
    #[must_use]
    pub fn to_u256(&self) -> Option<U256> {
        self.0.trim().parse::<U256>().ok()
    }
}

impl From<U256> for PositionId {
    fn from(value: U256) -> Self {
        Self(value.to_string())
    }
}
