use clap::Parser;
use settler::adapter::inbound::cli::command::{Cli, Commands};
use settler::adapter::inbound::cli::{markets, refresh, run, winners};
use settler::error::Result;
use settler::infrastructure::config::settings::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.init_logging();

    if let Err(e) = execute(&cli.command, &config).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn execute(command: &Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run => {
            info!("settler starting");
            run::execute(config).await
        }
        Commands::Refresh => refresh::execute(config).await,
        Commands::Markets(args) => markets::execute(config, args),
        Commands::Winners(args) => winners::execute(config, args).await,
    }
}
