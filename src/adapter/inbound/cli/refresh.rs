//! Handler for the `refresh` command.

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, Components};
use crate::infrastructure::config::settings::Config;

/// Execute the refresh command.
pub async fn execute(config: &Config) -> Result<()> {
    let components = Components::build(config)?;
    let summary = bootstrap::build_refresher(config, &components)
        .refresh()
        .await?;

    output::header("Refresh complete");
    output::field("Pages", summary.pages);
    output::field("Events", summary.events);
    output::field("Markets", summary.markets);
    output::field("Dropped", summary.dropped);
    output::field("Inferred resolved", summary.inferred_resolved);
    output::field("Snapshot", config.storage.snapshot_path.display());
    Ok(())
}
