//! Handler for the `winners` command.

use crate::adapter::inbound::cli::command::WinnersArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::{MarketId, WinnerRecord};
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, Components};
use crate::infrastructure::config::settings::Config;

/// Execute the winners command: reconstruct, store, print.
pub async fn execute(config: &Config, args: &WinnersArgs) -> Result<()> {
    let components = Components::build(config)?;
    let settlement = bootstrap::build_settlement(config, &components)?;

    let record = settlement
        .winners_for_market(
            &MarketId::new(args.market.clone()),
            args.outcome.as_deref(),
            args.cutoff,
        )
        .await?;
    components.store.save(&components.state.snapshot())?;

    if args.json {
        return output::json(&record);
    }
    print_record(&record);
    Ok(())
}

fn print_record(record: &WinnerRecord) {
    output::header(&format!("Winners of {}", record.market_id));
    output::field("Outcome", &record.outcome_label);
    output::field("Position", &record.position_id);
    output::field("Cutoff block", record.resolution_sequence_number);
    output::field("Holders", record.winner_count);
    output::field("Total payout", record.total_payout);
    for winner in &record.winners {
        println!("  {}  {}", winner.address, winner.payout);
    }
}
