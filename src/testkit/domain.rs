//! Builders for domain primitives used across tests.
//!
//! Concise factories for addresses, transfers, markets and events so tests
//! focus on assertions rather than construction boilerplate.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

use crate::domain::{
    Event, EventId, Market, MarketId, MarketStatus, MarketTable, Outcome, PositionId,
    TransferEvent,
};

/// Deterministic non-zero address derived from `n`.
pub fn addr(n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&n.to_be_bytes());
    Address::from(bytes)
}

pub fn position(id: &str) -> PositionId {
    PositionId::from(id)
}

pub fn market_id(id: &str) -> MarketId {
    MarketId::from(id)
}

pub fn event_id(id: &str) -> EventId {
    EventId::from(id)
}

/// A transfer of `amount` units of `position_id` at block `sequence`.
pub fn transfer(
    position_id: &str,
    sender: Address,
    recipient: Address,
    amount: u64,
    sequence: u64,
) -> TransferEvent {
    TransferEvent {
        position_id: position(position_id),
        sender,
        recipient,
        amount: U256::from(amount),
        sequence_number: sequence,
        log_index: 0,
    }
}

pub fn mint(position_id: &str, recipient: Address, amount: u64, sequence: u64) -> TransferEvent {
    transfer(position_id, Address::ZERO, recipient, amount, sequence)
}

pub fn burn(position_id: &str, sender: Address, amount: u64, sequence: u64) -> TransferEvent {
    transfer(position_id, sender, Address::ZERO, amount, sequence)
}

/// An event with zeroed counters.
pub fn event(id: &str, title: &str) -> Event {
    Event {
        id: event_id(id),
        title: title.to_string(),
        slug: None,
        volume: 0.0,
        active_markets: 0,
        resolved_markets: 0,
    }
}

/// An active Yes/No market. The No price mirrors the Yes price.
pub fn binary_market(
    id: &str,
    event: &str,
    yes_position: &str,
    no_position: &str,
    yes_price: Option<Decimal>,
) -> Market {
    let no_price = yes_price.map(|p| Decimal::ONE - p);
    Market {
        id: market_id(id),
        event_id: event_id(event),
        question: format!("Question for {id}?"),
        slug: None,
        outcomes: vec![
            Outcome {
                label: "Yes".to_string(),
                position_id: position(yes_position),
                price: yes_price,
            },
            Outcome {
                label: "No".to_string(),
                position_id: position(no_position),
                price: no_price,
            },
        ],
        status: MarketStatus::Active,
        volume: 0.0,
        end_date: None,
    }
}

/// One event `e1` with two active binary markets:
/// `m1` (positions 11/12) and `m2` (positions 21/22).
pub fn sample_table() -> MarketTable {
    MarketTable::from_parts(
        vec![event("e1", "Sample event")],
        vec![
            binary_market("m1", "e1", "11", "12", Some(Decimal::new(5, 1))),
            binary_market("m2", "e1", "21", "22", Some(Decimal::new(5, 1))),
        ],
    )
}
