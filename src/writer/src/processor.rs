use std::sync::Arc;

use common::config::Configuration;
use common::model::{Deal, ExportRow, Need, NewPairRecord};
use common::{Error, ErrorKind, Result};
use futures::stream::{self, TryStreamExt};
use matcher::{EligibilityClassifier, MatchStrategy, MatchingPipeline, reconcile};
use tracing::Instrument;

use crate::coordinator::PersistenceCoordinator;
use crate::export::ExportSink;

/// Totals of one completed invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationSummary {
    pub needs_seen: usize,
    pub needs_skipped: usize,
    pub records_written: usize,
}

/// Fold state carried from need to need.
///
/// `written` holds every record persisted in this invocation, in write order,
/// and is what compensation removes.
#[derive(Debug, Default)]
struct RollbackLog {
    written: Vec<NewPairRecord>,
    summary: InvocationSummary,
}

/// A need step that stopped the fold
struct Interrupted {
    error: Error,
    rollback: RollbackLog,
}

/// Runs matching, reconciliation, persistence and export for each need in order.
pub struct NeedProcessor {
    pipeline: MatchingPipeline,
    classifier: EligibilityClassifier,
    coordinator: PersistenceCoordinator,
    sink: Arc<dyn ExportSink>,
}

impl NeedProcessor {
    pub fn new(
        pipeline: MatchingPipeline,
        classifier: EligibilityClassifier,
        coordinator: PersistenceCoordinator,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        Self {
            pipeline,
            classifier,
            coordinator,
            sink,
        }
    }

    pub fn from_config(
        config: &Configuration,
        coordinator: PersistenceCoordinator,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        Self::new(
            MatchingPipeline::from_config(&config.matching),
            EligibilityClassifier::from_config(&config.matching),
            coordinator,
            sink,
        )
    }

    /// Process needs strictly in order.
    ///
    /// An export failure removes every record written so far in this call and
    /// stops before the next need. Any other failure stops without removal.
    pub async fn process(
        &self,
        partition: &str,
        needs: &[Need],
        deals: &[Deal],
    ) -> Result<InvocationSummary> {
        let folded = stream::iter(needs.iter().map(Ok::<&Need, Interrupted>))
            .try_fold(RollbackLog::default(), |rollback, need| {
                let span = tracing::info_span!("need", need_id = %need.id);
                self.process_need(rollback, partition, need, deals).instrument(span)
            })
            .await;

        match folded {
            Ok(rollback) => {
                log::info!(
                    "Processed {} needs: {} skipped, {} records written",
                    rollback.summary.needs_seen,
                    rollback.summary.needs_skipped,
                    rollback.summary.records_written
                );
                Ok(rollback.summary)
            }
            Err(Interrupted { error, rollback }) if error.kind() == ErrorKind::Export => {
                self.compensate(&rollback.written).await;
                Err(error)
            }
            Err(Interrupted { error, .. }) => Err(error),
        }
    }

    async fn process_need(
        &self,
        mut rollback: RollbackLog,
        partition: &str,
        need: &Need,
        deals: &[Deal],
    ) -> Result<RollbackLog, Interrupted> {
        rollback.summary.needs_seen += 1;

        let strategy = MatchStrategy::for_need(need);
        let matched = self.pipeline.run(need, strategy, deals);
        if matched.is_empty() {
            log::debug!("No deals match need {}", need.id);
            rollback.summary.needs_skipped += 1;
            return Ok(rollback);
        }

        let existing = match self.coordinator.existing(&need.id).await {
            Ok(existing) => existing,
            Err(error) => return Err(Interrupted { error, rollback }),
        };

        let records = reconcile(&existing, &matched, need, &self.classifier);
        if records.is_empty() {
            log::debug!(
                "Need {} already reconciled against {} matched deals",
                need.id,
                matched.len()
            );
            rollback.summary.needs_skipped += 1;
            return Ok(rollback);
        }

        if let Err(error) = self.coordinator.persist(&records).await {
            return Err(Interrupted { error, rollback });
        }
        rollback.summary.records_written += records.len();
        rollback.written.extend_from_slice(&records);

        let rows: Vec<ExportRow> = records.iter().map(NewPairRecord::to_export_row).collect();
        if let Err(error) = self.sink.export(&rows, partition, &need.id).await {
            return Err(Interrupted { error, rollback });
        }

        log::info!(
            "Need {}: {} matched deals, {} new records",
            need.id,
            matched.len(),
            records.len()
        );
        Ok(rollback)
    }

    async fn compensate(&self, written: &[NewPairRecord]) {
        log::warn!(
            "Export failed, removing {} records written in this invocation",
            written.len()
        );

        let report = self.coordinator.remove(written).await;
        if report.is_complete() {
            log::info!("Removed {} records", report.removed);
        } else {
            log::error!(
                "Removed {} records, {} could not be removed",
                report.removed,
                report.failed.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RetryPolicy;
    use crate::export::MockExportSink;
    use crate::store::memory::InMemoryPairStore;
    use common::model::{DealStage, StoredPair};
    use std::time::Duration;

    fn need(id: &str) -> Need {
        Need {
            id: id.to_string(),
            owner_id: format!("{id}-owner"),
            account_id: "acc".to_string(),
            regions: vec!["A".to_string()],
            industries: vec!["X".to_string()],
            ..Default::default()
        }
    }

    fn deal(id: &str, industry: &str) -> Deal {
        Deal {
            id: id.to_string(),
            owner_id: format!("{id}-owner"),
            region: "A".to_string(),
            industries: vec![industry.to_string()],
            stage: DealStage::CaseInProgress,
            rank: "A".to_string(),
            ..Default::default()
        }
    }

    fn processor(store: &InMemoryPairStore, sink: MockExportSink) -> NeedProcessor {
        let coordinator = PersistenceCoordinator::new(
            Arc::new(store.clone()),
            25,
            RetryPolicy {
                max_retries: 1,
                delay: Duration::from_millis(1),
            },
        );
        NeedProcessor::new(
            MatchingPipeline::new("日本国外"),
            EligibilityClassifier::new(["S", "A", "B", "B-"]),
            coordinator,
            Arc::new(sink),
        )
    }

    #[tokio::test]
    async fn test_writes_and_exports_new_records() {
        let store = InMemoryPairStore::new();
        let mut sink = MockExportSink::new();
        sink.expect_export()
            .withf(|rows, _, need_id| rows.len() == 2 && need_id == "n1")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = processor(&store, sink)
            .process("dt=1", &[need("n1")], &[deal("d1", "X")])
            .await
            .unwrap();

        assert_eq!(
            summary,
            InvocationSummary {
                needs_seen: 1,
                needs_skipped: 0,
                records_written: 2,
            }
        );
        assert_eq!(store.pairs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_need_skips_store() {
        let store = InMemoryPairStore::new();
        let mut sink = MockExportSink::new();
        sink.expect_export().never();

        let summary = processor(&store, sink)
            .process("dt=1", &[need("n1")], &[deal("d1", "other")])
            .await
            .unwrap();

        assert_eq!(summary.needs_skipped, 1);
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_reconciled_need_is_skipped() {
        let store = InMemoryPairStore::new();
        for suffix in ["_Needs", "_Deal"] {
            store
                .insert(StoredPair {
                    need_id: "n1".to_string(),
                    sort_key: format!("d1_{suffix}"),
                    deal_id: "d1".to_string(),
                })
                .await;
        }
        let mut sink = MockExportSink::new();
        sink.expect_export().never();

        let summary = processor(&store, sink)
            .process("dt=1", &[need("n1")], &[deal("d1", "X")])
            .await
            .unwrap();

        assert_eq!(summary.needs_skipped, 1);
        assert_eq!(summary.records_written, 0);
        assert!(store.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_failure_removes_union_and_stops() {
        let store = InMemoryPairStore::new();
        let mut sink = MockExportSink::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_export()
            .withf(|_, _, need_id| need_id == "n1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        sink.expect_export()
            .withf(|_, _, need_id| need_id == "n2")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::export("bucket gone")));

        let needs = [need("n1"), need("n2"), need("n3")];
        let err = processor(&store, sink)
            .process("dt=1", &needs, &[deal("d1", "X")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Export);
        assert!(store.pairs().await.is_empty());

        let calls = store.calls().await;
        let puts: Vec<_> = calls.iter().filter(|c| c.op == crate::WriteOp::Put).collect();
        let deletes: Vec<_> = calls
            .iter()
            .filter(|c| c.op == crate::WriteOp::Delete)
            .collect();
        // n3 never reached the store
        assert_eq!(puts.len(), 2);
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].items.len(), 4);
    }

    #[tokio::test]
    async fn test_store_failure_propagates_without_compensation() {
        let store = InMemoryPairStore::new();
        store.set_unavailable(true).await;
        let mut sink = MockExportSink::new();
        sink.expect_export().never();

        let err = processor(&store, sink)
            .process("dt=1", &[need("n1")], &[deal("d1", "X")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(
            store
                .calls()
                .await
                .iter()
                .all(|c| c.op == crate::WriteOp::Put)
        );
    }
}
