// =============================================================================
// Indicator Storage
// =============================================================================
//
// Persistence contract for computed rows:
//
//   stage          bulk insert into a staging area (repeatable per run)
//   merge_staged   upsert every staged row by bar id into the permanent
//                  tables, then empty staging
//   discard_staged drop staging without touching permanent tables
//
// Re-running a computation and merging again is idempotent: the same bar id
// always lands on the same permanent row.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::averages::EmaValues;
use crate::error::StorageError;
use crate::rows::{
    EmaRow, IndicatorRow, MomentumRow, MovingAverageRow, PatternRow, RegimeRow, RowBatch,
    StopsRow, TrendRow, VolatilityRow,
};
use crate::types::GroupKey;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Storage collaborator used by the orchestrator.
pub trait IndicatorStore {
    fn stage(&mut self, batch: &RowBatch) -> Result<(), StorageError>;

    fn merge_staged(&mut self) -> Result<MergeSummary, StorageError>;

    fn discard_staged(&mut self) -> Result<(), StorageError>;

    /// Most recent persisted EMA row per group, by timestamp.
    fn latest_ema_seeds(&self) -> Result<HashMap<GroupKey, EmaValues>, StorageError>;
}

// =============================================================================
// Merge accounting
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableMerge {
    pub inserted: usize,
    pub updated: usize,
}

/// Inserted/updated counts per permanent table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub tables: BTreeMap<&'static str, TableMerge>,
}

impl MergeSummary {
    pub fn inserted(&self) -> usize {
        self.tables.values().map(|t| t.inserted).sum()
    }

    pub fn updated(&self) -> usize {
        self.tables.values().map(|t| t.updated).sum()
    }

    pub fn table(&self, name: &str) -> TableMerge {
        self.tables.get(name).copied().unwrap_or_default()
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, t) in &self.tables {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}: +{} ~{}", t.inserted, t.updated)?;
        }
        Ok(())
    }
}

// =============================================================================
// Permanent tables
// =============================================================================

pub const MOVING_AVERAGES: &str = "moving_averages";
pub const EMA: &str = "ema";
pub const MOMENTUM: &str = "momentum";
pub const REGIME_VOLATILITY: &str = "regime_volatility";
pub const REGIME_TREND: &str = "regime_trend";
pub const REGIME_PATTERNS: &str = "regime_patterns";
pub const REGIME_STOPS: &str = "regime_stops";
pub const REGIME_FINAL: &str = "regime_final";

/// The eight permanent tables, each keyed uniquely by bar id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTables {
    #[serde(default)]
    pub moving_averages: BTreeMap<i64, MovingAverageRow>,
    #[serde(default)]
    pub ema: BTreeMap<i64, EmaRow>,
    #[serde(default)]
    pub momentum: BTreeMap<i64, MomentumRow>,
    #[serde(default)]
    pub regime_volatility: BTreeMap<i64, VolatilityRow>,
    #[serde(default)]
    pub regime_trend: BTreeMap<i64, TrendRow>,
    #[serde(default)]
    pub regime_patterns: BTreeMap<i64, PatternRow>,
    #[serde(default)]
    pub regime_stops: BTreeMap<i64, StopsRow>,
    #[serde(default)]
    pub regime_final: BTreeMap<i64, RegimeRow>,
}

impl IndicatorTables {
    /// Upsert every row of `batch`.  Rows are checked before any table is
    /// touched, so a rejected batch leaves the tables unchanged.
    pub fn upsert(&mut self, batch: RowBatch) -> Result<MergeSummary, StorageError> {
        check_groups(MOVING_AVERAGES, &self.moving_averages, &batch.moving_averages)?;
        check_groups(EMA, &self.ema, &batch.ema)?;
        check_groups(MOMENTUM, &self.momentum, &batch.momentum)?;
        check_groups(REGIME_VOLATILITY, &self.regime_volatility, &batch.volatility)?;
        check_groups(REGIME_TREND, &self.regime_trend, &batch.trend)?;
        check_groups(REGIME_PATTERNS, &self.regime_patterns, &batch.patterns)?;
        check_groups(REGIME_STOPS, &self.regime_stops, &batch.stops)?;
        check_groups(REGIME_FINAL, &self.regime_final, &batch.regime)?;

        let mut summary = MergeSummary::default();
        let mut record = |name: &'static str, merge: TableMerge| {
            summary.tables.insert(name, merge);
        };
        record(MOVING_AVERAGES, upsert_rows(&mut self.moving_averages, batch.moving_averages));
        record(EMA, upsert_rows(&mut self.ema, batch.ema));
        record(MOMENTUM, upsert_rows(&mut self.momentum, batch.momentum));
        record(REGIME_VOLATILITY, upsert_rows(&mut self.regime_volatility, batch.volatility));
        record(REGIME_TREND, upsert_rows(&mut self.regime_trend, batch.trend));
        record(REGIME_PATTERNS, upsert_rows(&mut self.regime_patterns, batch.patterns));
        record(REGIME_STOPS, upsert_rows(&mut self.regime_stops, batch.stops));
        record(REGIME_FINAL, upsert_rows(&mut self.regime_final, batch.regime));
        Ok(summary)
    }

    pub fn latest_ema_seeds(&self) -> HashMap<GroupKey, EmaValues> {
        let mut latest: HashMap<GroupKey, &EmaRow> = HashMap::new();
        for row in self.ema.values() {
            let key = row.header.key();
            let newer = latest.get(&key).map_or(true, |current| {
                (row.header.timestamp, row.bar_id())
                    > (current.header.timestamp, current.bar_id())
            });
            if newer {
                latest.insert(key, row);
            }
        }
        latest
            .into_iter()
            .map(|(key, row)| (key, row.values))
            .collect()
    }
}

/// A bar id already stored must keep its group.
fn check_groups<T>(
    table: &'static str,
    existing: &BTreeMap<i64, IndicatorRow<T>>,
    rows: &[IndicatorRow<T>],
) -> Result<(), StorageError> {
    for row in rows {
        if let Some(stored) = existing.get(&row.bar_id()) {
            if stored.header.key() != row.header.key() {
                return Err(StorageError::Merge {
                    table,
                    reason: format!(
                        "bar {} is stored for group {} but staged for group {}",
                        row.bar_id(),
                        stored.header.key(),
                        row.header.key()
                    ),
                });
            }
        }
    }
    Ok(())
}

fn upsert_rows<T>(
    table: &mut BTreeMap<i64, IndicatorRow<T>>,
    rows: Vec<IndicatorRow<T>>,
) -> TableMerge {
    let mut merge = TableMerge::default();
    for row in rows {
        match table.insert(row.bar_id(), row) {
            Some(_) => merge.updated += 1,
            None => merge.inserted += 1,
        }
    }
    merge
}
