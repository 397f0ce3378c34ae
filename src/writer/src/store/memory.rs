use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use common::Result;
use common::config::MAX_BATCH_ITEMS;
use common::model::StoredPair;
use tokio::sync::Mutex;

use super::{PairStore, WriteOp};

/// One recorded `batch_write` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub op: WriteOp,
    pub items: Vec<StoredPair>,
}

#[derive(Debug, Default)]
struct Inner {
    pairs: BTreeMap<(String, String), StoredPair>,
    calls: Vec<BatchCall>,
    // per upcoming call: how many trailing items to leave unprocessed
    withheld: VecDeque<usize>,
    unavailable: bool,
}

/// Pair store kept in process memory.
///
/// Used for local runs and tests. Throttling can be simulated with
/// [`InMemoryPairStore::withhold`] and [`InMemoryPairStore::set_unavailable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryPairStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryPairStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the last `counts[i]` items of the i-th upcoming batch unprocessed
    pub async fn withhold(&self, counts: impl IntoIterator<Item = usize>) {
        self.inner.lock().await.withheld.extend(counts);
    }

    /// While set, every batch leaves all of its items unprocessed
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    pub async fn insert(&self, pair: StoredPair) {
        let mut inner = self.inner.lock().await;
        inner
            .pairs
            .insert((pair.need_id.clone(), pair.sort_key.clone()), pair);
    }

    /// Snapshot of all stored pairs, ordered by need id then sort key
    pub async fn pairs(&self) -> Vec<StoredPair> {
        self.inner.lock().await.pairs.values().cloned().collect()
    }

    pub async fn calls(&self) -> Vec<BatchCall> {
        self.inner.lock().await.calls.clone()
    }
}

#[async_trait]
impl PairStore for InMemoryPairStore {
    async fn query(&self, need_id: &str) -> Result<Vec<StoredPair>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .pairs
            .values()
            .filter(|pair| pair.need_id == need_id)
            .cloned()
            .collect())
    }

    async fn batch_write(&self, op: WriteOp, items: &[StoredPair]) -> Result<Vec<StoredPair>> {
        if items.len() > MAX_BATCH_ITEMS {
            return Err(common::Error::validation(format!(
                "Batch of {} items exceeds the limit of {MAX_BATCH_ITEMS}",
                items.len()
            )));
        }

        let mut inner = self.inner.lock().await;
        inner.calls.push(BatchCall {
            op,
            items: items.to_vec(),
        });

        let withheld = if inner.unavailable {
            items.len()
        } else {
            inner.withheld.pop_front().unwrap_or(0).min(items.len())
        };
        let (processed, unprocessed) = items.split_at(items.len() - withheld);

        for pair in processed {
            let key = (pair.need_id.clone(), pair.sort_key.clone());
            match op {
                WriteOp::Put => {
                    inner.pairs.insert(key, pair.clone());
                }
                WriteOp::Delete => {
                    inner.pairs.remove(&key);
                }
            }
        }

        Ok(unprocessed.to_vec())
    }
}
