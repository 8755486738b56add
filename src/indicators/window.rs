// =============================================================================
// Rolling Window — bounded FIFO with an incrementally maintained sum
// =============================================================================
//
// Backing store for every fixed-length queue in the engine (true range, ±DM,
// DX, log-returns, 22-bar highs/lows).  `push` is O(1): the value leaving the
// window is subtracted from the running sum instead of re-summing.
//
// Float cancellation can leave a tiny residue in the sum once every non-zero
// value has left the window, so the count of non-zero entries is tracked and
// the sum snaps back to exactly 0.0 when it drops to zero.  The ±DI and DX
// zero-guards depend on that.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    nonzero: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
            sum: 0.0,
            nonzero: 0,
        }
    }

    /// Append `value`, evicting the oldest entry once the window is full.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        if value != 0.0 {
            self.nonzero += 1;
        }

        while self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                if old != 0.0 {
                    self.nonzero -= 1;
                }
            }
        }

        if self.nonzero == 0 {
            self.sum = 0.0;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean over the full window, or 0.0 while still filling.
    pub fn full_mean(&self) -> f64 {
        if self.capacity == 0 || !self.is_full() {
            return 0.0;
        }
        self.sum / self.capacity as f64
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Sample standard deviation (n - 1 denominator); 0.0 with fewer than two
    /// entries.
    pub fn sample_std_dev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.sum / n as f64;
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_and_keeps_sum() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert!((w.sum() - 9.0).abs() < 1e-12);
        assert_eq!(w.max(), Some(4.0));
        assert_eq!(w.min(), Some(2.0));
    }

    #[test]
    fn full_mean_is_zero_until_full() {
        let mut w = RollingWindow::new(3);
        w.push(3.0);
        w.push(6.0);
        assert_eq!(w.full_mean(), 0.0);
        w.push(9.0);
        assert!((w.full_mean() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn sum_snaps_to_zero_when_only_zeros_remain() {
        let mut w = RollingWindow::new(3);
        for v in [0.1, 0.2, 0.3, 0.0, 0.0, 0.0] {
            w.push(v);
        }
        assert_eq!(w.sum(), 0.0);
        assert_eq!(w.full_mean(), 0.0);
    }

    #[test]
    fn sample_std_dev_matches_hand_calculation() {
        let mut w = RollingWindow::new(10);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            w.push(v);
        }
        // mean 5, squared deviations sum 32, n-1 = 7
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((w.sample_std_dev() - expected).abs() < 1e-12);

        let mut single = RollingWindow::new(5);
        single.push(1.0);
        assert_eq!(single.sample_std_dev(), 0.0);
    }
}
