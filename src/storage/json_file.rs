// =============================================================================
// JSON file store
// =============================================================================
//
// Permanent tables live in one JSON document.  Staging stays in memory; each
// successful merge rewrites the document with the tmp + rename pattern so a
// crash mid-write never leaves a truncated file behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::averages::EmaValues;
use crate::error::StorageError;
use crate::rows::RowBatch;
use crate::storage::{IndicatorStore, IndicatorTables, MemoryStore, MergeSummary};
use crate::types::GroupKey;

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`.  A missing file starts with empty tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let tables = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let tables: IndicatorTables = serde_json::from_str(&content)?;
            info!(
                path = %path.display(),
                ema_rows = tables.ema.len(),
                regime_rows = tables.regime_final.len(),
                "Indicator store loaded"
            );
            tables
        } else {
            info!(path = %path.display(), "Indicator store not found, starting empty");
            IndicatorTables::default()
        };

        Ok(Self {
            path,
            inner: MemoryStore::with_tables(tables),
        })
    }

    pub fn tables(&self) -> &IndicatorTables {
        self.inner.tables()
    }

    fn save(&self) -> Result<(), StorageError> {
        let content = serde_json::to_string(self.inner.tables())?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!(path = %self.path.display(), "Indicator store saved (atomic)");
        Ok(())
    }
}

impl IndicatorStore for JsonFileStore {
    fn stage(&mut self, batch: &RowBatch) -> Result<(), StorageError> {
        self.inner.stage(batch)
    }

    fn merge_staged(&mut self) -> Result<MergeSummary, StorageError> {
        let summary = self.inner.merge_staged()?;
        self.save()?;
        Ok(summary)
    }

    fn discard_staged(&mut self) -> Result<(), StorageError> {
        self.inner.discard_staged()
    }

    fn latest_ema_seeds(&self) -> Result<HashMap<GroupKey, EmaValues>, StorageError> {
        self.inner.latest_ema_seeds()
    }
}
