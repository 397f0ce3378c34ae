use std::path::Path;
use std::sync::Arc;

use acceptor::MessageHandler;
use anyhow::{Context, Result};
use clap::Parser;
use common::cli::{CommonArgs, Commands, utils};
use common::config::{Configuration, StoreBackend};
use common::storage::ObjectStores;
use tokio::io::AsyncReadExt;
use writer::{DynamoDbPairStore, InMemoryPairStore, PairStore};

#[derive(Parser)]
#[command(name = "dealmatch")]
#[command(about = "Matches buying needs against deals and exports the new pairs")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    // Load application configuration
    let config = utils::load_config(cli.common.config.as_ref())?;

    match cli.command {
        Commands::Process { event } => process(&config, &event).await,
        Commands::Config { json } => utils::show_config(&config, json),
        Commands::Validate => {
            utils::validate_config(&config)?;
            println!("Configuration is valid");
            Ok(())
        }
        Commands::Version => {
            println!("dealmatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn process(config: &Configuration, event: &Path) -> Result<()> {
    utils::validate_config(config)?;

    let body = read_event(event).await?;
    let stores = ObjectStores::from_config(config).context("Failed to create object stores")?;
    let handler = MessageHandler::from_config(config, &stores, pair_store(config).await);

    let response = handler
        .process_message(&body)
        .await
        .context("Invocation failed")?;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

async fn read_event(path: &Path) -> Result<String> {
    let mut body = String::new();

    if path.as_os_str() == "-" {
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read event from stdin")?;
    } else {
        body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event from {}", path.display()))?;
    }

    Ok(body)
}

async fn pair_store(config: &Configuration) -> Arc<dyn PairStore> {
    match config.persistence.backend {
        StoreBackend::Memory => {
            log::warn!("Using the in-memory pair store, pairs are dropped on exit");
            Arc::new(InMemoryPairStore::new())
        }
        StoreBackend::DynamoDb => Arc::new(DynamoDbPairStore::from_config(&config.persistence).await),
    }
}
