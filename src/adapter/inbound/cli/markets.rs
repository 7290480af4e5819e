//! Handler for the `markets` command.

use crate::adapter::inbound::cli::command::MarketsArgs;
use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::store::JsonFileStore;
use crate::domain::{Market, MarketStatus};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::SnapshotStore;

/// Execute the markets command. Reads the snapshot only; no network.
#[allow(clippy::result_large_err)]
pub fn execute(config: &Config, args: &MarketsArgs) -> Result<()> {
    let snapshot = JsonFileStore::new(config.storage.snapshot_path.clone()).load()?;
    let markets: Vec<&Market> = snapshot
        .markets
        .iter()
        .filter(|m| !args.resolved || m.is_resolved())
        .collect();

    if args.json {
        return output::json(&markets);
    }

    output::header(&format!("{} markets", markets.len()));
    for market in markets {
        println!(
            "  {}  {:<10} {}  [{}]",
            market.id,
            status_label(&market.status),
            market.question,
            prices(market)
        );
    }
    Ok(())
}

fn status_label(status: &MarketStatus) -> String {
    match status {
        MarketStatus::Active => "active".into(),
        MarketStatus::Closed => "closed".into(),
        MarketStatus::Resolved {
            winning_outcome: Some(label),
        } => format!("won:{label}"),
        MarketStatus::Resolved {
            winning_outcome: None,
        } => "resolved".into(),
    }
}

fn prices(market: &Market) -> String {
    market
        .outcomes
        .iter()
        .map(|o| match o.price {
            Some(price) => format!("{}={price}", o.label),
            None => format!("{}=?", o.label),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
