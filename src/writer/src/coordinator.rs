use std::sync::Arc;
use std::time::Duration;

use common::config::PersistenceConfig;
use common::model::{NewPairRecord, StoredPair};
use common::{Error, Result};

use crate::store::{PairStore, WriteOp};

/// How unprocessed batch items are re-submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-submissions after the first attempt
    pub max_retries: u32,
    /// Fixed wait before each re-submission
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl From<&PersistenceConfig> for RetryPolicy {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay,
        }
    }
}

/// Outcome of a compensating removal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: usize,
    pub failed: Vec<StoredPair>,
}

impl RemovalReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Chunked writes and deletes against a [`PairStore`].
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: Arc<dyn PairStore>,
    batch_limit: usize,
    retry: RetryPolicy,
}

impl PersistenceCoordinator {
    pub fn new(store: Arc<dyn PairStore>, batch_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            store,
            batch_limit: batch_limit.clamp(1, common::config::MAX_BATCH_ITEMS),
            retry,
        }
    }

    pub fn from_config(store: Arc<dyn PairStore>, config: &PersistenceConfig) -> Self {
        Self::new(store, config.effective_batch_limit(), RetryPolicy::from(config))
    }

    /// Pairs already stored for a need
    pub async fn existing(&self, need_id: &str) -> Result<Vec<StoredPair>> {
        self.store.query(need_id).await
    }

    /// Write all records, one batch per chunk, in order.
    ///
    /// Fails with `StoreUnavailable` as soon as a chunk still has unprocessed
    /// items after the retry budget; later chunks are not attempted.
    pub async fn persist(&self, records: &[NewPairRecord]) -> Result<()> {
        let pairs: Vec<StoredPair> = records.iter().map(NewPairRecord::to_stored).collect();

        for chunk in pairs.chunks(self.batch_limit) {
            self.write_chunk(WriteOp::Put, chunk).await?;
        }

        log::debug!("Persisted {} pair records", pairs.len());
        Ok(())
    }

    /// Best-effort delete of all records. Every chunk is attempted; failures
    /// are logged and reported, never returned.
    pub async fn remove(&self, records: &[NewPairRecord]) -> RemovalReport {
        let pairs: Vec<StoredPair> = records.iter().map(NewPairRecord::to_stored).collect();
        let mut report = RemovalReport::default();

        for chunk in pairs.chunks(self.batch_limit) {
            match self.write_chunk(WriteOp::Delete, chunk).await {
                Ok(()) => report.removed += chunk.len(),
                Err(e) => {
                    log::error!("Failed to remove {} pair records: {e}", chunk.len());
                    report.failed.extend_from_slice(chunk);
                }
            }
        }

        report
    }

    async fn write_chunk(&self, op: WriteOp, chunk: &[StoredPair]) -> Result<()> {
        let mut pending = self.store.batch_write(op, chunk).await?;
        let mut retries = 0;

        while !pending.is_empty() {
            if retries >= self.retry.max_retries {
                log::error!(
                    "Batch {op:?} gave up after {retries} retries with {} unprocessed items",
                    pending.len()
                );
                return Err(Error::store_unavailable(format!(
                    "{} of {} items still unprocessed after {retries} retries",
                    pending.len(),
                    chunk.len()
                )));
            }

            retries += 1;
            log::warn!(
                "Batch {op:?} left {} items unprocessed, retry {retries}/{} in {:?}",
                pending.len(),
                self.retry.max_retries,
                self.retry.delay
            );
            tokio::time::sleep(self.retry.delay).await;
            pending = self.store.batch_write(op, &pending).await?;
        }

        Ok(())
    }
}
