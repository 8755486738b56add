// =============================================================================
// Historical Volatility — annualised sample std-dev of log-returns
// =============================================================================
//
//   HV = stdev(ln(close_t / close_{t-1}) over 20 bars) * sqrt(252) * 100
//
// A group's first bar, and any bar where close / prev_close is not a positive
// finite ratio, contributes a 0 return rather than being skipped.

use crate::indicators::window::RollingWindow;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Log-return of `close` against `prev_close`; 0 when undefined.
pub fn log_return(close: f64, prev_close: Option<f64>) -> f64 {
    match prev_close {
        Some(prev) if prev > 0.0 => {
            let ratio = close / prev;
            if ratio > 0.0 && ratio.is_finite() {
                ratio.ln()
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct HistoricalVolatility {
    returns: RollingWindow,
}

impl HistoricalVolatility {
    pub fn new(period: usize) -> Self {
        Self {
            returns: RollingWindow::new(period),
        }
    }

    /// Feed one log-return and return the annualised volatility in percent.
    pub fn update(&mut self, log_return: f64) -> f64 {
        self.returns.push(log_return);
        let hv = self.returns.sample_std_dev() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
        if hv.is_finite() {
            hv
        } else {
            0.0
        }
    }
}
