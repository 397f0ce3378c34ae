use std::sync::Arc;

use common::config::Configuration;
use common::storage::ObjectStores;
use common::Result;
use matcher::EligibilityClassifier;
use serde::Serialize;
use tracing::Instrument;
use writer::{
    ExportSink, InvocationSummary, NeedProcessor, ObjectStoreExporter, PairStore,
    PersistenceCoordinator,
};

use crate::sources::SourceLoader;
use crate::trigger::Trigger;

pub const SUCCESS_BODY: &str = "Success!";

/// Reply to the trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: message.into(),
        }
    }
}

/// Handles one trigger message end to end.
pub struct MessageHandler {
    sources: SourceLoader,
    classifier: EligibilityClassifier,
    processor: NeedProcessor,
}

impl MessageHandler {
    pub fn new(
        sources: SourceLoader,
        classifier: EligibilityClassifier,
        processor: NeedProcessor,
    ) -> Self {
        Self {
            sources,
            classifier,
            processor,
        }
    }

    /// Wire sources, the pair store and the export bucket from configuration
    pub fn from_config(
        config: &Configuration,
        stores: &ObjectStores,
        pair_store: Arc<dyn PairStore>,
    ) -> Self {
        let sink: Arc<dyn ExportSink> =
            Arc::new(ObjectStoreExporter::new(stores.export.clone(), &config.export));
        Self::with_sink(config, stores, pair_store, sink)
    }

    pub fn with_sink(
        config: &Configuration,
        stores: &ObjectStores,
        pair_store: Arc<dyn PairStore>,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        let coordinator = PersistenceCoordinator::from_config(pair_store, &config.persistence);

        Self::new(
            SourceLoader::from_stores(stores, &config.sources),
            EligibilityClassifier::from_config(&config.matching),
            NeedProcessor::from_config(config, coordinator, sink),
        )
    }

    /// Validation and missing-object errors become a 500 response. Everything
    /// else, compensated export failures included, is returned as an error.
    pub async fn process_message(&self, body: &str) -> Result<InvocationResponse> {
        log::info!("Received event: {body}");

        match self.run(body).await {
            Ok(summary) => {
                if let Some(summary) = summary {
                    log::debug!("Invocation summary: {summary:?}");
                }
                log::info!("Process complete.");
                Ok(InvocationResponse::success())
            }
            Err(e) if e.is_boundary() => {
                log::error!("ERROR: {e}");
                Ok(InvocationResponse::failure(e.message()))
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self, body: &str) -> Result<Option<InvocationSummary>> {
        let trigger = Trigger::parse(body)?;
        log::info!("Processing {} in partition {}", trigger.key, trigger.partition);

        let span = tracing::info_span!("invocation", partition = %trigger.partition);
        self.run_trigger(&trigger).instrument(span).await
    }

    async fn run_trigger(&self, trigger: &Trigger) -> Result<Option<InvocationSummary>> {
        let deals = self
            .sources
            .load_deals(&trigger.partition, &self.classifier)
            .await?;
        if deals.is_empty() {
            log::info!("No deals to process. Aborting operation.");
            return Ok(None);
        }

        let needs = self.sources.load_needs(&trigger.key).await?;
        log::info!("Total needs: {}, total deals: {}", needs.len(), deals.len());

        let summary = self
            .processor
            .process(&trigger.partition, &needs, &deals)
            .await?;
        Ok(Some(summary))
    }
}
