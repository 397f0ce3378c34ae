use std::sync::Arc;

use async_trait::async_trait;
use common::config::ExportConfig;
use common::model::ExportRow;
use common::{Error, Result};
use futures::future::join_all;
use object_store::{ObjectStore, PutPayload, path::Path};

/// Receives the rows created for one need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Fails with an `Export` error when any part of the write fails.
    async fn export(&self, rows: &[ExportRow], partition: &str, need_id: &str) -> Result<()>;
}

/// Writes rows as CSV files into an object store.
///
/// Rows are split into files of at most `split_limit` rows, named
/// `{partition}/{file_prefix}-{need_id}-{index:04}.csv`, and uploaded concurrently.
#[derive(Debug, Clone)]
pub struct ObjectStoreExporter {
    store: Arc<dyn ObjectStore>,
    file_prefix: String,
    split_limit: usize,
}

impl ObjectStoreExporter {
    pub fn new(store: Arc<dyn ObjectStore>, config: &ExportConfig) -> Self {
        Self {
            store,
            file_prefix: config.file_prefix.clone(),
            split_limit: config.split_limit.max(1),
        }
    }

    pub fn chunk_path(&self, partition: &str, need_id: &str, index: usize) -> Path {
        Path::from(format!(
            "{partition}/{}-{need_id}-{index:04}.csv",
            self.file_prefix
        ))
    }

    async fn upload(&self, path: Path, rows: &[ExportRow]) -> Result<()> {
        let body = encode_rows(rows)?;

        self.store
            .put(&path, PutPayload::from(body))
            .await
            .map_err(|e| Error::export(format!("Failed to write {path}")).with_source(e))?;

        log::debug!("Wrote {} rows to {path}", rows.len());
        Ok(())
    }
}

/// Header line followed by one line per row, unquoted, `\n` terminated
pub fn encode_rows(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::export("Failed to encode export row").with_source(e))?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::export(format!("Failed to flush export rows: {}", e.error())))
}

#[async_trait]
impl ExportSink for ObjectStoreExporter {
    async fn export(&self, rows: &[ExportRow], partition: &str, need_id: &str) -> Result<()> {
        let uploads = rows
            .chunks(self.split_limit)
            .enumerate()
            .map(|(index, chunk)| self.upload(self.chunk_path(partition, need_id, index), chunk));

        let failures: Vec<Error> = join_all(uploads)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) => {
                log::error!("Export for need {need_id} failed: {first}");
                Err(first)
            }
        }
    }
}
