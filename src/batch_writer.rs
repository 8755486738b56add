// =============================================================================
// Batch Writer
// =============================================================================
//
// Accumulates per-bar rows and stages them in bulk once `batch_size` bars are
// pending.  Staging is synchronous: the pass over bars waits for every flush.

use tracing::{debug, info};

use crate::error::StorageError;
use crate::rows::{BarRows, RowBatch};
use crate::storage::IndicatorStore;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

pub struct BatchWriter<'a, S: IndicatorStore + ?Sized> {
    store: &'a mut S,
    batch: RowBatch,
    batch_size: usize,
    flushes: usize,
    processed: usize,
}

impl<'a, S: IndicatorStore + ?Sized> BatchWriter<'a, S> {
    /// `batch_size` is floored at 1.
    pub fn new(store: &'a mut S, batch_size: usize) -> Self {
        Self {
            store,
            batch: RowBatch::default(),
            batch_size: batch_size.max(1),
            flushes: 0,
            processed: 0,
        }
    }

    pub fn push(&mut self, rows: BarRows) -> Result<(), StorageError> {
        self.batch.push(rows);
        self.processed += 1;
        if self.batch.len() >= self.batch_size {
            self.flush()?;
            info!(processed = self.processed, "Processed bars");
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Stage whatever is left and return the total number of flushes.
    pub fn finish(mut self) -> Result<usize, StorageError> {
        if !self.batch.is_empty() {
            let remaining = self.batch.len();
            self.flush()?;
            info!(rows = remaining, processed = self.processed, "Final batch staged");
        }
        Ok(self.flushes)
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.store.stage(&self.batch)?;
        self.flushes += 1;
        debug!(flush = self.flushes, rows = self.batch.len(), "Batch flushed");
        self.batch.clear();
        Ok(())
    }
}
