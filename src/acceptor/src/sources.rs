use std::sync::Arc;

use common::config::SourcesConfig;
use common::model::{Deal, DealRow, DealStage, Need, NeedRow};
use common::storage::ObjectStores;
use common::{Error, Result};
use futures::TryStreamExt;
use matcher::EligibilityClassifier;
use object_store::{ObjectMeta, ObjectStore, path::Path};
use serde::de::DeserializeOwned;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads the needs and deals files of one partition.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    needs: Arc<dyn ObjectStore>,
    deals: Arc<dyn ObjectStore>,
    deal_file_prefix: String,
}

impl SourceLoader {
    pub fn new(
        needs: Arc<dyn ObjectStore>,
        deals: Arc<dyn ObjectStore>,
        config: &SourcesConfig,
    ) -> Self {
        Self {
            needs,
            deals,
            deal_file_prefix: config.deal_file_prefix.clone(),
        }
    }

    pub fn from_stores(stores: &ObjectStores, config: &SourcesConfig) -> Self {
        Self::new(stores.needs.clone(), stores.deals.clone(), config)
    }

    /// Location of the deals file inside `partition`
    pub async fn find_deals_file(&self, partition: &str) -> Result<Path> {
        let prefix = Path::from(partition);
        let mut objects: Vec<ObjectMeta> = self.deals.list(Some(&prefix)).try_collect().await?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        let file_prefix = format!("{partition}/{}", self.deal_file_prefix);
        objects
            .into_iter()
            .map(|meta| meta.location)
            .find(|location| {
                let location: &str = location.as_ref();
                location.starts_with(&file_prefix) && location.ends_with(".csv")
            })
            .ok_or_else(|| {
                Error::not_found(format!(
                    "No {}*.csv file in {partition}",
                    self.deal_file_prefix
                ))
            })
    }

    /// Deals of the partition that can appear in any output list
    pub async fn load_deals(
        &self,
        partition: &str,
        classifier: &EligibilityClassifier,
    ) -> Result<Vec<Deal>> {
        let path = self.find_deals_file(partition).await?;
        log::info!("Retrieving deals from {path}");

        let bytes = self.deals.get(&path).await?.bytes().await?;
        let rows: Vec<DealRow> = parse_rows(&bytes)?;
        let total = rows.len();

        let deals = rows
            .into_iter()
            .filter(|row| classifier.listable(DealStage::from_label(&row.stage), &row.rank))
            .map(Deal::try_from)
            .collect::<Result<Vec<_>>>()?;

        log::info!("Loaded {} of {total} deals", deals.len());
        Ok(deals)
    }

    /// Needs in the file the trigger pointed at
    pub async fn load_needs(&self, key: &str) -> Result<Vec<Need>> {
        let path = Path::from(key);
        log::info!("Retrieving needs from {path}");

        let bytes = self.needs.get(&path).await?.bytes().await?;
        let needs = parse_rows::<NeedRow>(&bytes)?
            .into_iter()
            .map(Need::try_from)
            .collect::<Result<Vec<_>>>()?;

        log::info!("Loaded {} needs", needs.len());
        Ok(needs)
    }
}

/// Deserialize a headed CSV file; fields are trimmed, missing columns are empty
pub fn parse_rows<R: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<R>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes)
        .deserialize()
        .collect::<std::result::Result<Vec<R>, csv::Error>>()
        .map_err(|e| Error::validation("Malformed source file").with_source(e))
}
