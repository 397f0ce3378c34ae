use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Hard limit of items per batch write request
pub const MAX_BATCH_ITEMS: usize = 25;

pub const CONFIG_FILE: &str = "dealmatch.toml";
pub const ENV_PREFIX: &str = "DEALMATCH__";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Corporate ranks a deal needs to be listed for buyers
    pub accepted_ranks: Vec<String>,
    /// Region value meaning "outside the home country"; never matched by region
    pub outside_home_region: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accepted_ranks: vec![
                "S".to_string(),
                "A".to_string(),
                "B".to_string(),
                "B-".to_string(),
            ],
            outside_home_region: "日本国外".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    DynamoDb,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Key-value store implementation
    pub backend: StoreBackend,
    pub table_name: String,
    pub region: String,
    /// Override endpoint, e.g. a local DynamoDB
    pub endpoint: Option<String>,
    /// Items per batch request, clamped to [`MAX_BATCH_ITEMS`]
    pub batch_limit: usize,
    /// Re-submissions of unprocessed items before giving up
    pub max_retries: u32,
    /// Wait between re-submissions
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            table_name: "search_pairs".to_string(),
            region: "ap-northeast-1".to_string(),
            endpoint: None,
            batch_limit: MAX_BATCH_ITEMS,
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl PersistenceConfig {
    pub fn effective_batch_limit(&self) -> usize {
        self.batch_limit.clamp(1, MAX_BATCH_ITEMS)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Object store DSN of the output bucket
    pub dsn: String,
    /// File name prefix, followed by the need id and chunk index
    pub file_prefix: String,
    /// Rows per export file
    pub split_limit: usize,
    /// Request SSE-S3 (`AES256`) encryption for files written to S3
    pub server_side_encryption: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dsn: "file:///.data/export".to_string(),
            file_prefix: "AWS_Search".to_string(),
            split_limit: 1000,
            server_side_encryption: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Object store DSN holding the needs files named by triggers
    pub needs_dsn: String,
    /// Object store DSN holding the deals snapshots
    pub deals_dsn: String,
    /// Deals file name prefix inside a partition directory
    pub deal_file_prefix: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            needs_dsn: "file:///.data/needs".to_string(),
            deals_dsn: "file:///.data/deals".to_string(),
            deal_file_prefix: "Deal__c".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    pub matching: MatchingConfig,
    pub persistence: PersistenceConfig,
    pub export: ExportConfig,
    pub sources: SourcesConfig,
}

impl Configuration {
    /// Defaults, then `dealmatch.toml`, then `DEALMATCH__*` environment variables
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(CONFIG_FILE))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(path))
    }

    fn figment(file: figment::providers::Data<Toml>) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}
