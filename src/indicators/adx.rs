// =============================================================================
// Average Directional Index (ADX) — Streaming, Arithmetic-Mean Variant
// =============================================================================
//
// Calculation pipeline, one bar at a time:
//   1. +DM / -DM from the move against the previous bar.
//   2. Smooth TR, +DM and -DM with a plain 14-bar mean (no Wilder smoothing).
//   3. +DI = 100 * smoothed(+DM) / ATR,  -DI = 100 * smoothed(-DM) / ATR
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI)
//   5. ADX = plain mean of the last 14 DX values.
//
// Every mean reads 0 until its window is full, and every ratio falls back to
// 0 on a zero denominator.
// =============================================================================

use crate::indicators::window::RollingWindow;

/// Directional movement of a bar against its predecessor.
///
/// Returns `(plus_dm, minus_dm)`.  Equal up and down moves cancel to zero.
pub fn directional_movement(high: f64, low: f64, prev_high: f64, prev_low: f64) -> (f64, f64) {
    let up_move = high - prev_high;
    let down_move = prev_low - low;

    let plus_dm = if up_move > down_move && up_move > 0.0 {
        up_move
    } else {
        0.0
    };
    let minus_dm = if down_move > up_move && down_move > 0.0 {
        down_move
    } else {
        0.0
    };
    (plus_dm, minus_dm)
}

/// Snapshot of the directional system after one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionalReading {
    pub atr: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub dx: f64,
    pub adx: f64,
}

/// Rolling state for TR / ±DM / DX queues of one group.
#[derive(Debug, Clone)]
pub struct DirectionalTracker {
    true_range: RollingWindow,
    plus_dm: RollingWindow,
    minus_dm: RollingWindow,
    dx: RollingWindow,
}

impl DirectionalTracker {
    pub fn new(period: usize) -> Self {
        Self {
            true_range: RollingWindow::new(period),
            plus_dm: RollingWindow::new(period),
            minus_dm: RollingWindow::new(period),
            dx: RollingWindow::new(period),
        }
    }

    pub fn update(&mut self, tr: f64, plus_dm: f64, minus_dm: f64) -> DirectionalReading {
        self.true_range.push(tr);
        self.plus_dm.push(plus_dm);
        self.minus_dm.push(minus_dm);

        let atr = self.true_range.full_mean();
        let (plus_di, minus_di) = if atr > 0.0 {
            (
                self.plus_dm.full_mean() / atr * 100.0,
                self.minus_dm.full_mean() / atr * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        let dx = compute_dx(plus_di, minus_di);
        self.dx.push(dx);

        DirectionalReading {
            atr,
            plus_di,
            minus_di,
            dx,
            adx: self.dx.full_mean(),
        }
    }
}

/// DX from the two directional indicators; 0 when both are zero.
fn compute_dx(plus_di: f64, minus_di: f64) -> f64 {
    let di_sum = plus_di + minus_di;
    if di_sum > 0.0 {
        (plus_di - minus_di).abs() / di_sum * 100.0
    } else {
        0.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::atr::true_range;

    #[test]
    fn dm_up_move_only() {
        assert_eq!(directional_movement(12.0, 9.5, 10.0, 9.0), (2.0, 0.0));
    }

    #[test]
    fn dm_down_move_only() {
        assert_eq!(directional_movement(10.0, 7.0, 10.5, 9.0), (0.0, 2.0));
    }

    #[test]
    fn dm_equal_moves_cancel() {
        assert_eq!(directional_movement(11.0, 8.0, 10.0, 9.0), (0.0, 0.0));
    }

    #[test]
    fn dm_inside_bar_is_zero() {
        assert_eq!(directional_movement(9.5, 9.2, 10.0, 9.0), (0.0, 0.0));
    }

    #[test]
    fn readings_zero_until_windows_fill() {
        let mut t = DirectionalTracker::new(3);
        let r = t.update(2.0, 1.0, 0.0);
        assert_eq!(r, DirectionalReading::default());
        t.update(2.0, 1.0, 0.0);
        let r = t.update(2.0, 1.0, 0.0);
        // ATR 2, +DM mean 1 => +DI 50, -DI 0, DX 100; DX window is (0, 0, 100)
        assert!((r.atr - 2.0).abs() < 1e-12);
        assert!((r.plus_di - 50.0).abs() < 1e-12);
        assert_eq!(r.minus_di, 0.0);
        assert!((r.dx - 100.0).abs() < 1e-12);
        assert!((r.adx - 100.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn adx_is_mean_of_dx_window() {
        let mut t = DirectionalTracker::new(2);
        t.update(2.0, 1.0, 0.0); // dx 0 (atr not ready)
        t.update(2.0, 1.0, 0.0); // dx 100
        let r = t.update(2.0, 0.0, 1.0); // +DM mean 0.5, -DM mean 0.5 => dx 0
        assert_eq!(r.dx, 0.0);
        assert!((r.adx - 50.0).abs() < 1e-12);
    }

    #[test]
    fn flat_market_keeps_everything_zero() {
        let mut t = DirectionalTracker::new(14);
        let mut last = DirectionalReading::default();
        for _ in 0..40 {
            last = t.update(0.0, 0.0, 0.0);
        }
        assert_eq!(last, DirectionalReading::default());
    }

    #[test]
    fn adx_result_range() {
        let mut t = DirectionalTracker::new(14);
        let mut prev = (51.0, 49.0, 50.0);
        for i in 1..120 {
            let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
            let (high, low, close) = (base + 1.0, base - 1.0, base + 0.5);
            let (pdm, mdm) = directional_movement(high, low, prev.0, prev.1);
            let r = t.update(true_range(high, low, prev.2), pdm, mdm);
            assert!((0.0..=100.0).contains(&r.adx), "ADX {} out of range", r.adx);
            assert!((0.0..=100.0).contains(&r.plus_di));
            assert!((0.0..=100.0).contains(&r.minus_di));
            prev = (high, low, close);
        }
    }
}
