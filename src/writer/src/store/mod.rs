use async_trait::async_trait;
use common::Result;
use common::model::StoredPair;

pub mod dynamodb;
pub mod memory;

/// Kind of a batch write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Put,
    Delete,
}

/// Key-value store holding need/deal pairs, partitioned by need id.
#[async_trait]
pub trait PairStore: Send + Sync {
    /// Every pair stored for `need_id`. Implementations page until exhausted.
    async fn query(&self, need_id: &str) -> Result<Vec<StoredPair>>;

    /// Submit one batch of at most 25 items.
    ///
    /// Returns the items the store did not process. A transport or service
    /// failure is an error, not a list of unprocessed items.
    async fn batch_write(&self, op: WriteOp, items: &[StoredPair]) -> Result<Vec<StoredPair>>;
}
