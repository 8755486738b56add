// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Building blocks shared by the indicator engines: pure window functions
// (RSI, stochastic, ROC) and small streaming trackers over bounded windows
// (ATR, directional movement, historical volatility).  None of them know about
// groups; the engines own one instance per (instrument, timeframe).

pub mod adx;
pub mod atr;
pub mod roc;
pub mod rsi;
pub mod stochastic;
pub mod volatility;
pub mod window;

pub use window::RollingWindow;
