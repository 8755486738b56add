// =============================================================================
// Output rows
// =============================================================================
//
// One row per bar per family, keyed by bar id and carrying the group key and
// bar timestamp.  Rows are append-only in meaning but upserted by bar id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::averages::{EmaValues, MovingAverages};
use crate::momentum::MomentumReading;
use crate::regime::{
    ChandelierLevels, PatternFlags, RegimeClassification, RegimeReading, TrendReading,
    VolatilityReading,
};
use crate::types::{Bar, GroupKey};

/// Identifying columns shared by every family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowHeader {
    pub bar_id: i64,
    pub instrument_id: i32,
    pub timeframe_id: i32,
    pub timestamp: DateTime<Utc>,
}

impl RowHeader {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.instrument_id, self.timeframe_id)
    }
}

impl From<&Bar> for RowHeader {
    fn from(bar: &Bar) -> Self {
        Self {
            bar_id: bar.id,
            instrument_id: bar.instrument_id,
            timeframe_id: bar.timeframe_id,
            timestamp: bar.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow<T> {
    #[serde(flatten)]
    pub header: RowHeader,
    #[serde(flatten)]
    pub values: T,
}

impl<T> IndicatorRow<T> {
    pub fn new(header: RowHeader, values: T) -> Self {
        Self { header, values }
    }

    pub fn bar_id(&self) -> i64 {
        self.header.bar_id
    }
}

pub type MovingAverageRow = IndicatorRow<MovingAverages>;
pub type EmaRow = IndicatorRow<EmaValues>;
pub type MomentumRow = IndicatorRow<MomentumReading>;
pub type VolatilityRow = IndicatorRow<VolatilityReading>;
pub type TrendRow = IndicatorRow<TrendReading>;
pub type PatternRow = IndicatorRow<PatternFlags>;
pub type StopsRow = IndicatorRow<ChandelierLevels>;
pub type RegimeRow = IndicatorRow<RegimeClassification>;

/// Every row one bar produces.
#[derive(Debug, Clone)]
pub struct BarRows {
    pub header: RowHeader,
    pub moving_averages: MovingAverages,
    pub ema: EmaValues,
    pub momentum: MomentumReading,
    pub regime: RegimeReading,
}

/// Pending rows, one vector per family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub moving_averages: Vec<MovingAverageRow>,
    pub ema: Vec<EmaRow>,
    pub momentum: Vec<MomentumRow>,
    pub volatility: Vec<VolatilityRow>,
    pub trend: Vec<TrendRow>,
    pub patterns: Vec<PatternRow>,
    pub stops: Vec<StopsRow>,
    pub regime: Vec<RegimeRow>,
}

impl RowBatch {
    /// Number of bars in the batch.  Every family holds one row per bar.
    pub fn len(&self) -> usize {
        self.moving_averages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, rows: BarRows) {
        let h = rows.header;
        self.moving_averages
            .push(IndicatorRow::new(h, rows.moving_averages));
        self.ema.push(IndicatorRow::new(h, rows.ema));
        self.momentum.push(IndicatorRow::new(h, rows.momentum));
        self.volatility
            .push(IndicatorRow::new(h, rows.regime.volatility));
        self.trend.push(IndicatorRow::new(h, rows.regime.trend));
        self.patterns.push(IndicatorRow::new(h, rows.regime.patterns));
        self.stops.push(IndicatorRow::new(h, rows.regime.stops));
        self.regime
            .push(IndicatorRow::new(h, rows.regime.classification));
    }

    /// Move every row of `other` into this batch, leaving `other` empty.
    pub fn append(&mut self, other: &mut RowBatch) {
        self.moving_averages.append(&mut other.moving_averages);
        self.ema.append(&mut other.ema);
        self.momentum.append(&mut other.momentum);
        self.volatility.append(&mut other.volatility);
        self.trend.append(&mut other.trend);
        self.patterns.append(&mut other.patterns);
        self.stops.append(&mut other.stops);
        self.regime.append(&mut other.regime);
    }

    pub fn clear(&mut self) {
        self.moving_averages.clear();
        self.ema.clear();
        self.momentum.clear();
        self.volatility.clear();
        self.trend.clear();
        self.patterns.clear();
        self.stops.clear();
        self.regime.clear();
    }
}
