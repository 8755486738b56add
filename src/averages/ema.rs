// =============================================================================
// Exponential Moving Average (EMA) Engine
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// Seeding differs from the textbook SMA seed:
//   - cold start: the group's first close becomes every EMA value as-is;
//   - warm start: the latest persisted EMA row is the baseline, and the
//     recurrence already applies to the group's first observed bar.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Periods in output-column order.
pub const EMA_PERIODS: [usize; 13] = [5, 9, 12, 20, 26, 50, 100, 200, 21, 55, 144, 233, 8];

/// One bar's worth of EMA values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaValues {
    pub ema_5_short: f64,
    pub ema_9_macd_signal: f64,
    pub ema_12_macd_fast: f64,
    pub ema_20_short: f64,
    pub ema_26_macd_slow: f64,
    pub ema_50_medium: f64,
    pub ema_100_long: f64,
    pub ema_200_long: f64,
    pub ema_21_fibo: f64,
    pub ema_55_fibo: f64,
    pub ema_144_fibo: f64,
    pub ema_233_fibo: f64,
    pub ema_8_short: f64,
}

impl From<[f64; 13]> for EmaValues {
    fn from(v: [f64; 13]) -> Self {
        Self {
            ema_5_short: v[0],
            ema_9_macd_signal: v[1],
            ema_12_macd_fast: v[2],
            ema_20_short: v[3],
            ema_26_macd_slow: v[4],
            ema_50_medium: v[5],
            ema_100_long: v[6],
            ema_200_long: v[7],
            ema_21_fibo: v[8],
            ema_55_fibo: v[9],
            ema_144_fibo: v[10],
            ema_233_fibo: v[11],
            ema_8_short: v[12],
        }
    }
}

impl From<EmaValues> for [f64; 13] {
    fn from(e: EmaValues) -> Self {
        [
            e.ema_5_short,
            e.ema_9_macd_signal,
            e.ema_12_macd_fast,
            e.ema_20_short,
            e.ema_26_macd_slow,
            e.ema_50_medium,
            e.ema_100_long,
            e.ema_200_long,
            e.ema_21_fibo,
            e.ema_55_fibo,
            e.ema_144_fibo,
            e.ema_233_fibo,
            e.ema_8_short,
        ]
    }
}

/// Smoothing factor `2 / (period + 1)`.
pub fn multiplier(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Rolling EMA state for one group.
#[derive(Debug, Clone)]
pub struct EmaState {
    values: [f64; 13],
    initialized: bool,
    /// True when the baseline came from persisted history.
    seeded: bool,
}

impl EmaState {
    /// Cold state: the first close will seed every period.
    pub fn cold() -> Self {
        Self {
            values: [0.0; 13],
            initialized: false,
            seeded: false,
        }
    }

    /// Warm state continuing from a persisted EMA row.
    pub fn from_seed(seed: EmaValues) -> Self {
        Self {
            values: seed.into(),
            initialized: true,
            seeded: true,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Feed the next close and return every EMA.
    pub fn update(&mut self, close: f64) -> EmaValues {
        if !self.initialized {
            self.values = [close; 13];
            self.initialized = true;
        } else {
            for (value, &period) in self.values.iter_mut().zip(EMA_PERIODS.iter()) {
                let k = multiplier(period);
                *value = close * k + *value * (1.0 - k);
            }
        }
        EmaValues::from(self.values)
    }
}

/// Close-seeded EMA series for a single instrument/timeframe.
///
/// Same seeding rule as the streaming engine: the first output equals the
/// first close, and one value is produced per input close.
pub fn ema_series(closes: &[f64], period: usize) -> Vec<f64> {
    let k = multiplier(period);
    let mut result = Vec::with_capacity(closes.len());
    let mut prev: Option<f64> = None;
    for &close in closes {
        let ema = match prev {
            None => close,
            Some(p) => close * k + p * (1.0 - k),
        };
        result.push(ema);
        prev = Some(ema);
    }
    result
}
