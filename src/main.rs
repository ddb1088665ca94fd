use anyhow::{Context, Result};
use clap::Parser;

use docsync::Settings;
use docsync::cli::commands;
use docsync::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init runs before any settings exist
    if let Commands::Init { force } = cli.command {
        docsync::logging::init();
        return commands::init::run_init(force);
    }

    let config = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Cannot load configuration from {}", path.display()))?,
        None => Settings::load().context("Cannot load configuration")?,
    };

    docsync::logging::init_with_config(&config.logging, config.debug);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&config),
        Commands::Parse { file, json } => commands::parse::run(&file, json),
        Commands::Index { only, dry_run } => {
            commands::index::run(&config, only.as_deref(), dry_run)
        }
        Commands::Watch { reap_interval } => commands::watch::run(&config, reap_interval).await,
        Commands::Get {
            index,
            uri_path,
            json,
        } => commands::get::run(&config, &index, &uri_path, json),
    }
}
