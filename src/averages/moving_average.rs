// =============================================================================
// Simple Moving Average Engine
// =============================================================================
//
// Fourteen SMAs per group, all fed from one shared history of raw closes
// capped at the longest period (500).  Each period keeps its own running sum:
//
//   sum_p += close
//   if history holds more than p closes: sum_p -= close leaving the window
//   MA_p   = sum_p / min(bars_seen, p)
//
// During warm-up (fewer bars than p) MA_p is the mean of everything seen so
// far.  It is never gated or undefined, including on the very first bar.
// =============================================================================

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Periods in output-column order.
pub const MA_PERIODS: [usize; 14] = [5, 8, 20, 30, 50, 100, 200, 500, 21, 55, 144, 233, 195, 390];

/// Longest period; also the history cap.
const MAX_PERIOD: usize = 500;

/// One bar's worth of moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma5: f64,
    pub ma8: f64,
    pub ma20: f64,
    pub ma30: f64,
    pub ma50: f64,
    pub ma100: f64,
    pub ma200: f64,
    pub ma500: f64,
    pub ma21_fib: f64,
    pub ma55_fib: f64,
    pub ma144_fib: f64,
    pub ma233_fib: f64,
    pub ma195_nyse: f64,
    pub ma390_nyse: f64,
}

impl From<[f64; 14]> for MovingAverages {
    fn from(v: [f64; 14]) -> Self {
        Self {
            ma5: v[0],
            ma8: v[1],
            ma20: v[2],
            ma30: v[3],
            ma50: v[4],
            ma100: v[5],
            ma200: v[6],
            ma500: v[7],
            ma21_fib: v[8],
            ma55_fib: v[9],
            ma144_fib: v[10],
            ma233_fib: v[11],
            ma195_nyse: v[12],
            ma390_nyse: v[13],
        }
    }
}

/// Rolling SMA state for one group.
#[derive(Debug, Clone)]
pub struct MovingAverageState {
    history: VecDeque<f64>,
    sums: [f64; 14],
    seen: usize,
}

impl Default for MovingAverageState {
    fn default() -> Self {
        Self {
            history: VecDeque::with_capacity(MAX_PERIOD + 1),
            sums: [0.0; 14],
            seen: 0,
        }
    }
}

impl MovingAverageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next close and return every moving average.
    pub fn update(&mut self, close: f64) -> MovingAverages {
        self.history.push_back(close);
        self.seen += 1;

        let len = self.history.len();
        let mut values = [0.0; 14];
        for (i, &period) in MA_PERIODS.iter().enumerate() {
            self.sums[i] += close;
            if len > period {
                self.sums[i] -= self.history[len - period - 1];
            }
            values[i] = self.sums[i] / self.seen.min(period) as f64;
        }

        // Kept one longer than MAX_PERIOD above so the 500 window could see
        // its leaving value.
        while self.history.len() > MAX_PERIOD {
            self.history.pop_front();
        }

        MovingAverages::from(values)
    }
}
