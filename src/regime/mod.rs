// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Volatility, trend, candle-pattern and trailing-stop metrics folded into a
// five-state market regime per (instrument, timeframe).

pub mod chandelier;
pub mod detector;
pub mod patterns;

pub use chandelier::ChandelierLevels;
pub use detector::{
    MarketRegime, RegimeClassification, RegimeReading, RegimeState, TrendReading,
    VolatilityReading,
};
pub use patterns::PatternFlags;
