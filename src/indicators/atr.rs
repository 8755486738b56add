// =============================================================================
// Average True Range (ATR) — Arithmetic-Mean Variant
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// On a group's very first bar there is no previous close; the bar's own close
// stands in, which collapses TR to H - L.
//
// ATR here is the plain arithmetic mean of the last `period` TR values, not
// Wilder's exponential smoothing.  It reads 0 until the window is full.
// =============================================================================

use crate::indicators::window::RollingWindow;

/// True Range of one bar against the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// ATR expressed as a percentage of `close`; 0 when close is not positive.
pub fn atr_percent(atr: f64, close: f64) -> f64 {
    if close > 0.0 {
        (atr / close) * 100.0
    } else {
        0.0
    }
}

/// Streaming mean-of-TR tracker.
#[derive(Debug, Clone)]
pub struct AtrTracker {
    window: RollingWindow,
}

impl AtrTracker {
    pub fn new(period: usize) -> Self {
        Self {
            window: RollingWindow::new(period),
        }
    }

    /// Feed one TR value and return the current ATR.
    pub fn update(&mut self, tr: f64) -> f64 {
        self.window.push(tr);
        self.window.full_mean()
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_range_plain_range() {
        assert!((true_range(105.0, 95.0, 100.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn true_range_uses_prev_close_on_gap() {
        // Gap up: |115 - 95| = 20 > 115 - 108 = 7
        assert!((true_range(115.0, 108.0, 95.0) - 20.0).abs() < 1e-12);
        // Gap down: |90 - 110| = 20
        assert!((true_range(95.0, 90.0, 110.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn atr_zero_until_window_full() {
        let mut atr = AtrTracker::new(3);
        assert_eq!(atr.update(4.0), 0.0);
        assert_eq!(atr.update(5.0), 0.0);
        assert!(!atr.is_ready());
        assert!((atr.update(6.0) - 5.0).abs() < 1e-12);
        assert!(atr.is_ready());
    }

    #[test]
    fn atr_is_plain_mean_not_wilder() {
        let mut atr = AtrTracker::new(3);
        for tr in [3.0, 3.0, 3.0, 9.0] {
            atr.update(tr);
        }
        // mean(3, 9, 3) = 5; Wilder smoothing would give (5*2 + 3)/3.
        let v = atr.update(3.0);
        assert!((v - 5.0).abs() < 1e-12);
    }

    #[test]
    fn atr_percent_guards_close() {
        assert!((atr_percent(2.0, 100.0) - 2.0).abs() < 1e-12);
        assert_eq!(atr_percent(2.0, 0.0), 0.0);
    }
}
