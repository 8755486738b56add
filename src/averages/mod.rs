// =============================================================================
// Moving-average families (SMA + EMA)
// =============================================================================

pub mod ema;
pub mod moving_average;

pub use ema::{ema_series, EmaState, EmaValues, EMA_PERIODS};
pub use moving_average::{MovingAverageState, MovingAverages, MA_PERIODS};
