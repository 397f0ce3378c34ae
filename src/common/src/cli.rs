use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands of the dealmatch binary
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Process one trigger message and exit
    Process {
        #[arg(long, help = "File holding the message body, `-` for stdin")]
        event: PathBuf,
    },
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments. `RUST_LOG` wins when set.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Print configuration in human readable or JSON form
    pub fn show_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!("{config:#?}");
        }
        Ok(())
    }

    /// Sanity checks that figment cannot express
    pub fn validate_config(config: &Configuration) -> Result<()> {
        if config.matching.accepted_ranks.is_empty() {
            anyhow::bail!("matching.accepted_ranks must not be empty");
        }
        if config.persistence.table_name.trim().is_empty() {
            anyhow::bail!("persistence.table_name must not be empty");
        }
        if config.export.split_limit == 0 {
            anyhow::bail!("export.split_limit must be greater than zero");
        }
        if config.persistence.batch_limit > crate::config::MAX_BATCH_ITEMS {
            log::warn!(
                "persistence.batch_limit {} exceeds the store limit, using {}",
                config.persistence.batch_limit,
                crate::config::MAX_BATCH_ITEMS
            );
        }
        Ok(())
    }
}
