// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// Every error here aborts the whole run.  Inconsistent option combinations are
// not errors at all: they are logged as warnings and the run proceeds.

use thiserror::Error;

use crate::types::GroupKey;

/// Errors raised by the persistent-storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("merge into {table} failed: {reason}")]
    Merge { table: &'static str, reason: String },
}

/// Errors that abort an indicator run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A bar carried a missing or non-numeric value.
    #[error("bar {bar_id}: {reason}")]
    Computation { bar_id: i64, reason: String },

    /// A bar arrived earlier than its predecessor in the same group.
    #[error("bar {bar_id} in group {group} is out of order ({timestamp} precedes {previous})")]
    OutOfOrder {
        bar_id: i64,
        group: GroupKey,
        timestamp: chrono::DateTime<chrono::Utc>,
        previous: chrono::DateTime<chrono::Utc>,
    },

    /// The bar cursor itself failed.
    #[error("bar source failed: {0}")]
    Source(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub fn computation(bar_id: i64, reason: impl Into<String>) -> Self {
        EngineError::Computation {
            bar_id,
            reason: reason.into(),
        }
    }

    pub fn source(reason: impl Into<String>) -> Self {
        EngineError::Source(reason.into())
    }
}
