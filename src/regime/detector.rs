// =============================================================================
// Market Regime Detector — streaming, per group
// =============================================================================
//
// One bar at a time the detector derives:
//
//   Volatility : ATR(14) (plain mean of TR), ATR %, historical volatility(20)
//   Trend      : ADX(14), +DI(14), -DI(14)
//   Patterns   : inside / outside / pin bar against the previous bar
//   Stops      : chandelier exits over 22 bars
//
// and folds them into three scores and a discrete regime code:
//
//   TrendScore      = 0.6 * min(ADX/60, 1) + 0.4 * direction,  0.5 if ADX <= 0
//   VolatilityScore = mean(min(ATR%/5, 1), min(HV/20, 1))
//   OverallScore    = 0.4 * trend + 0.3 * volatility + 0.3 * pattern
//
// Classification hierarchy (evaluated top-to-bottom; first match wins):
//
//   1. HIGH_VOLATILITY — volatility > 0.7
//   2. LOW_VOLATILITY  — volatility < 0.3
//   3. TRENDING        — trend > 0.7, direction from +DI vs -DI
//   4. RANGING         — trend < 0.4
//   5. TRENDING        — |+DI - -DI| > 10, direction from +DI vs -DI
//
// If no rule fires, the regime defaults to RANGING.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::indicators::adx::{directional_movement, DirectionalTracker};
use crate::indicators::atr::{atr_percent, true_range};
use crate::indicators::volatility::{log_return, HistoricalVolatility};
use crate::regime::chandelier::{ChandelierLevels, ChandelierTracker};
use crate::regime::patterns::{Ohlc, PatternFlags};

const HISTORY_CAP: usize = 100;
const DIRECTIONAL_PERIOD: usize = 14;
const VOLATILITY_PERIOD: usize = 20;

// =============================================================================
// Types
// =============================================================================

/// Discrete market regime, persisted as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MarketRegime {
    TrendingUp = 1,
    TrendingDown = 2,
    Ranging = 3,
    HighVolatility = 4,
    LowVolatility = 5,
}

impl MarketRegime {
    pub fn code(self) -> u8 {
        self as u8
    }

    fn trending(plus_di: f64, minus_di: f64) -> Self {
        if plus_di > minus_di {
            Self::TrendingUp
        } else {
            Self::TrendingDown
        }
    }
}

impl From<MarketRegime> for u8 {
    fn from(regime: MarketRegime) -> Self {
        regime.code()
    }
}

impl TryFrom<u8> for MarketRegime {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::TrendingUp),
            2 => Ok(Self::TrendingDown),
            3 => Ok(Self::Ranging),
            4 => Ok(Self::HighVolatility),
            5 => Ok(Self::LowVolatility),
            other => Err(format!("unknown regime code {other}")),
        }
    }
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrendingUp => write!(f, "TRENDING_UP"),
            Self::TrendingDown => write!(f, "TRENDING_DOWN"),
            Self::Ranging => write!(f, "RANGING"),
            Self::HighVolatility => write!(f, "HIGH_VOLATILITY"),
            Self::LowVolatility => write!(f, "LOW_VOLATILITY"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub atr_14: f64,
    pub atr_percent: f64,
    pub historical_volatility_20: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub adx_14: f64,
    pub plus_di_14: f64,
    pub minus_di_14: f64,
}

/// Composite verdict for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassification {
    pub primary_regime: MarketRegime,
    pub regime_confidence: f64,
    pub regime_change_flag: bool,
    pub trend_score: f64,
    /// Mirrors `trend_score`; the regime pass has no momentum input of its own.
    pub momentum_score: f64,
    pub volatility_score: f64,
    pub overall_score: f64,
}

/// Everything the regime engine emits for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeReading {
    pub volatility: VolatilityReading,
    pub trend: TrendReading,
    pub patterns: PatternFlags,
    pub stops: ChandelierLevels,
    pub classification: RegimeClassification,
}

// =============================================================================
// Scores
// =============================================================================

pub fn trend_score(adx: f64, plus_di: f64, minus_di: f64) -> f64 {
    if adx <= 0.0 {
        return 0.5;
    }

    let adx_component = (adx / 60.0).min(1.0);
    let di_diff = plus_di - minus_di;
    let direction_component = if di_diff != 0.0 {
        0.5 + (di_diff.abs() / 40.0).min(0.5) * di_diff.signum()
    } else {
        0.5
    };

    (adx_component * 0.6 + direction_component * 0.4).clamp(0.0, 1.0)
}

pub fn volatility_score(atr: f64, close: f64, historical_volatility: f64) -> f64 {
    let atr_component = if close > 0.0 {
        (atr_percent(atr, close) / 5.0).min(1.0)
    } else {
        0.5
    };
    let hv_component = (historical_volatility / 20.0).min(1.0);
    (atr_component + hv_component) / 2.0
}

pub fn regime_confidence(trend: f64, volatility: f64) -> f64 {
    let trend_conf = (trend - 0.5).abs() * 2.0;
    let vol_conf = (volatility - 0.5).abs() * 2.0;
    (trend_conf + vol_conf) / 2.0
}

// =============================================================================
// Classification logic
// =============================================================================

pub fn classify(trend: f64, volatility: f64, plus_di: f64, minus_di: f64) -> MarketRegime {
    if volatility > 0.7 {
        return MarketRegime::HighVolatility;
    }
    if volatility < 0.3 {
        return MarketRegime::LowVolatility;
    }
    if trend > 0.7 {
        return MarketRegime::trending(plus_di, minus_di);
    }
    if trend < 0.4 {
        return MarketRegime::Ranging;
    }
    if (plus_di - minus_di).abs() > 10.0 {
        return MarketRegime::trending(plus_di, minus_di);
    }

    trace!(
        trend = format!("{:.4}", trend),
        volatility = format!("{:.4}", volatility),
        "Regime: no rule matched, defaulting to RANGING"
    );
    MarketRegime::Ranging
}

// =============================================================================
// RegimeState
// =============================================================================

/// Rolling regime state for one group.
#[derive(Debug, Clone)]
pub struct RegimeState {
    /// Recent bars, latest last.
    history: VecDeque<Ohlc>,
    directional: DirectionalTracker,
    volatility: HistoricalVolatility,
    chandelier: ChandelierTracker,
    last_regime: Option<MarketRegime>,
}

impl Default for RegimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl RegimeState {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAP),
            directional: DirectionalTracker::new(DIRECTIONAL_PERIOD),
            volatility: HistoricalVolatility::new(VOLATILITY_PERIOD),
            chandelier: ChandelierTracker::default(),
            last_regime: None,
        }
    }

    pub fn update(&mut self, open: f64, high: f64, low: f64, close: f64) -> RegimeReading {
        let bar = Ohlc {
            open,
            high,
            low,
            close,
        };
        let prev = self.history.back().copied();

        let prev_close = prev.map_or(close, |p| p.close);
        let tr = true_range(high, low, prev_close);
        let (plus_dm, minus_dm) = match prev {
            Some(p) => directional_movement(high, low, p.high, p.low),
            None => (0.0, 0.0),
        };

        self.history.push_back(bar);
        if self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        // --- Volatility / trend -------------------------------------------------
        let directional = self.directional.update(tr, plus_dm, minus_dm);
        let hv = self
            .volatility
            .update(log_return(close, prev.map(|p| p.close)));

        let volatility = VolatilityReading {
            atr_14: directional.atr,
            atr_percent: atr_percent(directional.atr, close),
            historical_volatility_20: hv,
        };
        let trend = TrendReading {
            adx_14: directional.adx,
            plus_di_14: directional.plus_di,
            minus_di_14: directional.minus_di,
        };

        // --- Patterns / stops ---------------------------------------------------
        let patterns = PatternFlags::detect(&bar, prev.as_ref());
        let stops = self.chandelier.update(high, low, tr);

        // --- Scores + classification -------------------------------------------
        let trend_score = trend_score(trend.adx_14, trend.plus_di_14, trend.minus_di_14);
        let volatility_score = volatility_score(volatility.atr_14, close, hv);
        let overall_score = trend_score * 0.4 + volatility_score * 0.3 + patterns.score() * 0.3;

        let regime = classify(
            trend_score,
            volatility_score,
            trend.plus_di_14,
            trend.minus_di_14,
        );
        let regime_change_flag = self.last_regime != Some(regime);
        if regime_change_flag {
            debug!(
                regime = %regime,
                previous = ?self.last_regime,
                trend_score = format!("{:.4}", trend_score),
                volatility_score = format!("{:.4}", volatility_score),
                "Regime changed"
            );
            self.last_regime = Some(regime);
        }

        RegimeReading {
            volatility,
            trend,
            patterns,
            stops,
            classification: RegimeClassification {
                primary_regime: regime,
                regime_confidence: regime_confidence(trend_score, volatility_score),
                regime_change_flag,
                trend_score,
                momentum_score: trend_score,
                volatility_score,
                overall_score,
            },
        }
    }
}
