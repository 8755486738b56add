// =============================================================================
// Momentum Engine — RSI / Stochastic / ROC composite
// =============================================================================
//
// Per group the engine keeps the last 50 closes (RSI, ROC) and the last 30
// high/low/close triples (stochastic).  Every metric is recomputed from those
// bounded windows each bar:
//
//   RSI 7 / 14 / 21, RSI(14) z-score, percentile bucket and 5-bar slope
//   Stochastic %K(14), %D(14, 3), 3-bar %K slope
//   ROC 7 / 14
//   Momentum score = 0.4 * RSI14 + 0.4 * %K14 + 0.2 * normalised ROC14
//   Overbought     = RSI14 > 70 || %K14 > 80
//   Oversold       = RSI14 < 30 || %K14 < 20

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::indicators::roc::{current_roc, normalize_roc};
use crate::indicators::rsi::{rsi_percentile, rsi_slope, rsi_zscore, window_rsi};
use crate::indicators::stochastic::{stochastic_d, stochastic_k, stochastic_slope, Hlc};

const CLOSE_HISTORY: usize = 50;
const BAR_HISTORY: usize = 30;
const RSI_SLOPE_LOOKBACK: usize = 5;

/// Momentum metrics for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumReading {
    pub rsi_14: f64,
    pub rsi_7: f64,
    pub rsi_21: f64,
    pub rsi_zscore: f64,
    pub rsi_percentile: f64,
    pub rsi_slope_5: f64,
    pub stoch_k_14: f64,
    pub stoch_d_14: f64,
    pub stoch_slope: f64,
    pub roc_14: f64,
    pub roc_7: f64,
    pub momentum_score: f64,
    pub overbought: bool,
    pub oversold: bool,
}

/// Rolling momentum state for one group.
#[derive(Debug, Clone, Default)]
pub struct MomentumState {
    closes: VecDeque<f64>,
    bars: VecDeque<Hlc>,
}

impl MomentumState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> MomentumReading {
        self.closes.push_back(close);
        if self.closes.len() > CLOSE_HISTORY {
            self.closes.pop_front();
        }
        self.bars.push_back(Hlc { high, low, close });
        if self.bars.len() > BAR_HISTORY {
            self.bars.pop_front();
        }

        let closes: &[f64] = self.closes.make_contiguous();
        let n = closes.len();

        let rsi_14 = window_rsi(closes, 14);
        let rsi_7 = window_rsi(closes, 7);
        let rsi_21 = window_rsi(closes, 21);
        let rsi_zscore = rsi_zscore(n, rsi_14);
        let rsi_percentile = rsi_percentile(n, rsi_14);
        let rsi_slope_5 = rsi_slope(closes, RSI_SLOPE_LOOKBACK);
        let roc_14 = current_roc(closes, 14);
        let roc_7 = current_roc(closes, 7);

        let bars: &[Hlc] = self.bars.make_contiguous();
        let stoch_k_14 = stochastic_k(bars, 14);
        let stoch_d_14 = stochastic_d(bars, 14, 3);
        let stoch_slope = stochastic_slope(bars);

        let momentum_score = rsi_14 * 0.4 + stoch_k_14 * 0.4 + normalize_roc(roc_14) * 0.2;

        MomentumReading {
            rsi_14,
            rsi_7,
            rsi_21,
            rsi_zscore,
            rsi_percentile,
            rsi_slope_5,
            stoch_k_14,
            stoch_d_14,
            stoch_slope,
            roc_14,
            roc_7,
            momentum_score,
            overbought: rsi_14 > 70.0 || stoch_k_14 > 80.0,
            oversold: rsi_14 < 30.0 || stoch_k_14 < 20.0,
        }
    }
}
