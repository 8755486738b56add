// =============================================================================
// Chandelier Exits — 22-bar volatility trailing stops
// =============================================================================
//
//   Long  = highest_high(22) - 3 * ATR(22)
//   Short = lowest_low(22)   + 3 * ATR(22)
//
// ATR(22) is the plain mean of the last 22 true ranges.  Both levels stay 0
// until 22 bars of high/low/TR history exist for the group.

use serde::{Deserialize, Serialize};

use crate::indicators::atr::AtrTracker;
use crate::indicators::window::RollingWindow;

const WINDOW: usize = 22;
const ATR_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChandelierLevels {
    pub chandelier_exit_long: f64,
    pub chandelier_exit_short: f64,
}

#[derive(Debug, Clone)]
pub struct ChandelierTracker {
    highs: RollingWindow,
    lows: RollingWindow,
    atr: AtrTracker,
}

impl Default for ChandelierTracker {
    fn default() -> Self {
        Self {
            highs: RollingWindow::new(WINDOW),
            lows: RollingWindow::new(WINDOW),
            atr: AtrTracker::new(WINDOW),
        }
    }
}

impl ChandelierTracker {
    pub fn update(&mut self, high: f64, low: f64, true_range: f64) -> ChandelierLevels {
        self.highs.push(high);
        self.lows.push(low);
        let atr = self.atr.update(true_range);

        if !(self.highs.is_full() && self.atr.is_ready()) {
            return ChandelierLevels::default();
        }

        match (self.highs.max(), self.lows.min()) {
            (Some(highest), Some(lowest)) => ChandelierLevels {
                chandelier_exit_long: highest - ATR_MULTIPLIER * atr,
                chandelier_exit_short: lowest + ATR_MULTIPLIER * atr,
            },
            _ => ChandelierLevels::default(),
        }
    }
}
