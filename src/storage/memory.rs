// =============================================================================
// In-memory store
// =============================================================================

use std::collections::HashMap;

use tracing::debug;

use crate::averages::EmaValues;
use crate::error::StorageError;
use crate::rows::RowBatch;
use crate::storage::{IndicatorStore, IndicatorTables, MergeSummary};
use crate::types::GroupKey;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: IndicatorTables,
    staging: RowBatch,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: IndicatorTables) -> Self {
        Self {
            tables,
            staging: RowBatch::default(),
        }
    }

    pub fn tables(&self) -> &IndicatorTables {
        &self.tables
    }

    /// Bars currently waiting in staging.
    pub fn staged_len(&self) -> usize {
        self.staging.len()
    }
}

impl IndicatorStore for MemoryStore {
    fn stage(&mut self, batch: &RowBatch) -> Result<(), StorageError> {
        self.staging.append(&mut batch.clone());
        debug!(rows = batch.len(), staged = self.staging.len(), "Batch staged");
        Ok(())
    }

    fn merge_staged(&mut self) -> Result<MergeSummary, StorageError> {
        let staged = std::mem::take(&mut self.staging);
        self.tables.upsert(staged)
    }

    fn discard_staged(&mut self) -> Result<(), StorageError> {
        self.staging.clear();
        Ok(())
    }

    fn latest_ema_seeds(&self) -> Result<HashMap<GroupKey, EmaValues>, StorageError> {
        Ok(self.tables.latest_ema_seeds())
    }
}
