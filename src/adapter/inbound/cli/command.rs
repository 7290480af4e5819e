//! Command-line interface definitions.
//!
//! Defines the CLI structure for the settler application using `clap`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prediction market settlement watcher
#[derive(Parser, Debug)]
#[command(name = "settler")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults apply when it is missing)
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh markets, stream live updates and settle resolved markets
    Run,

    /// Run one full market refresh and save the snapshot
    Refresh,

    /// List markets from the snapshot
    Markets(MarketsArgs),

    /// Reconstruct the holders of a market's winning outcome
    Winners(WinnersArgs),
}

/// Arguments for the `markets` subcommand.
#[derive(Parser, Debug)]
pub struct MarketsArgs {
    /// Only list resolved markets
    #[arg(long)]
    pub resolved: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `winners` subcommand.
#[derive(Parser, Debug)]
pub struct WinnersArgs {
    /// Market condition id
    pub market: String,

    /// Winning outcome label, overriding the recorded resolution
    #[arg(long)]
    pub outcome: Option<String>,

    /// Last block to include (defaults to the chain head)
    #[arg(long)]
    pub cutoff: Option<u64>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn winners_parses_overrides() {
        let cli = Cli::try_parse_from([
            "settler", "winners", "0xabc", "--outcome", "Yes", "--cutoff", "120", "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Winners(args) => {
                assert_eq!(args.market, "0xabc");
                assert_eq!(args.outcome.as_deref(), Some("Yes"));
                assert_eq!(args.cutoff, Some(120));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["settler", "markets", "--resolved", "-c", "alt.toml"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(
            cli.command,
            Commands::Markets(MarketsArgs { resolved: true, json: false })
        ));
    }
}
