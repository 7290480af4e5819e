//! Holder ledger folded from transfer events.
//!
//! The ledger never holds a zero or negative balance: a debit that would
//! reach zero (or below) removes the entry. This holds after every single
//! event, not only at the end of a fold, so inspecting the ledger between
//! windows is deterministic.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use super::id::PositionId;
use super::transfer::{TransferEvent, TransferKind};

/// Address → balance mapping for one position as of a cutoff block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderLedger {
    position_id: PositionId,
    cutoff: u64,
    balances: BTreeMap<Address, U256>,
}

impl HolderLedger {
    /// Create an empty ledger.
    pub fn new(position_id: PositionId, cutoff: u64) -> Self {
        Self {
            position_id,
            cutoff,
            balances: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn position_id(&self) -> &PositionId {
        &self.position_id
    }

    /// Last block included in the fold.
    #[must_use]
    pub const fn cutoff(&self) -> u64 {
        self.cutoff
    }

    /// Fold one event into the ledger.
    pub fn apply(&mut self, event: &TransferEvent) {
        match event.kind() {
            TransferKind::Mint => self.credit(event.recipient, event.amount),
            TransferKind::Burn => self.debit(event.sender, event.amount),
            TransferKind::Transfer => {
                self.debit(event.sender, event.amount);
                self.credit(event.recipient, event.amount);
            }
        }
    }

    /// Fold a batch of events in the order given.
    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a TransferEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    fn credit(&mut self, holder: Address, amount: U256) {
        if holder == Address::ZERO || amount.is_zero() {
            return;
        }
        let balance = self.balances.entry(holder).or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, holder: Address, amount: U256) {
        let Some(balance) = self.balances.get_mut(&holder) else {
            return;
        };
        if *balance <= amount {
            self.balances.remove(&holder);
        } else {
            *balance -= amount;
        }
    }

    /// Balance of `holder`, zero when absent.
    #[must_use]
    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or(U256::ZERO)
    }

    #[must_use]
    pub fn contains(&self, holder: &Address) -> bool {
        self.balances.contains_key(holder)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Entries in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }
}
