// =============================================================================
// Relative Strength Index (RSI) — Trailing-Window Recompute
// =============================================================================
//
// RSI is recomputed from scratch every bar over the last `period` deltas:
//
//   avg_gain = sum(positive deltas) / period
//   avg_loss = sum(|negative deltas|) / period
//   RS       = avg_gain / avg_loss
//   RSI      = 100 - 100 / (1 + RS)
//
// This is NOT Wilder's smoothed RSI; the two series diverge materially.
// Consumers expecting classic Wilder values must not compare against these.
//
// Fallbacks: fewer than `period + 1` closes => 50; zero average loss => 100
// (a perfectly flat window included).
// =============================================================================

/// Minimum number of closes before the z-score and percentile are reported.
const MIN_CLOSES_FOR_DISTRIBUTION: usize = 20;

/// Period used by the slope, z-score and percentile derivatives.
const BASE_PERIOD: usize = 14;

/// RSI over the trailing `period` deltas of `closes` (oldest first).
pub fn window_rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gain, loss) = window.windows(2).fold((0.0_f64, 0.0_f64), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l + change.abs())
        }
    });

    let period_f = period as f64;
    let avg_gain = gain / period_f;
    let avg_loss = loss / period_f;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Rough z-score of an RSI reading around its neutral midpoint.
pub fn rsi_zscore(close_count: usize, rsi: f64) -> f64 {
    if close_count < MIN_CLOSES_FOR_DISTRIBUTION {
        return 0.0;
    }
    (rsi - 50.0) / 10.0
}

/// Bucketed percentile of an RSI reading.
pub fn rsi_percentile(close_count: usize, rsi: f64) -> f64 {
    if close_count < MIN_CLOSES_FOR_DISTRIBUTION {
        return 50.0;
    }
    match rsi {
        r if r > 70.0 => 90.0,
        r if r > 60.0 => 70.0,
        r if r > 50.0 => 55.0,
        r if r > 40.0 => 45.0,
        r if r > 30.0 => 30.0,
        _ => 10.0,
    }
}

/// Per-bar change of RSI(14) over the last `lookback` bars.
///
/// Needs `lookback + 15` closes, otherwise 0.
pub fn rsi_slope(closes: &[f64], lookback: usize) -> f64 {
    if lookback == 0 || closes.len() < lookback + BASE_PERIOD + 1 {
        return 0.0;
    }
    let now = window_rsi(closes, BASE_PERIOD);
    let then = window_rsi(&closes[..closes.len() - lookback], BASE_PERIOD);
    (now - then) / lookback as f64
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    #[test]
    fn rsi_insufficient_data_is_neutral() {
        // 14 closes => 13 deltas < 14.
        assert_eq!(window_rsi(&ascending(14), 14), 50.0);
        assert_eq!(window_rsi(&[], 14), 50.0);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        assert!((window_rsi(&ascending(15), 14) - 100.0).abs() < 1e-10);
        assert!((window_rsi(&ascending(40), 7) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = ascending(30).into_iter().rev().collect();
        assert!(window_rsi(&closes, 14).abs() < 1e-10);
    }

    #[test]
    fn rsi_flat_window_is_100() {
        // zero average loss wins over zero average gain
        assert_eq!(window_rsi(&[100.0; 30], 14), 100.0);
    }

    #[test]
    fn rsi_only_uses_trailing_window() {
        // Early crash is outside the 3-delta window.
        let closes = [100.0, 50.0, 51.0, 52.0, 51.0];
        // deltas in window: +1, +1, -1 => gain 2/3, loss 1/3 => RS 2
        let expected = 100.0 - 100.0 / 3.0;
        assert!((window_rsi(&closes, 3) - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for end in 1..=closes.len() {
            let v = window_rsi(&closes[..end], 14);
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn percentile_buckets() {
        assert_eq!(rsi_percentile(25, 75.0), 90.0);
        assert_eq!(rsi_percentile(25, 65.0), 70.0);
        assert_eq!(rsi_percentile(25, 55.0), 55.0);
        assert_eq!(rsi_percentile(25, 45.0), 45.0);
        assert_eq!(rsi_percentile(25, 35.0), 30.0);
        assert_eq!(rsi_percentile(25, 30.0), 10.0);
        assert_eq!(rsi_percentile(10, 75.0), 50.0);
    }

    #[test]
    fn zscore_gated_on_history() {
        assert_eq!(rsi_zscore(19, 80.0), 0.0);
        assert!((rsi_zscore(20, 80.0) - 3.0).abs() < 1e-10);
    }

    #[test]
    fn slope_requires_lookback_plus_fifteen() {
        assert_eq!(rsi_slope(&ascending(19), 5), 0.0);

        // 15 flat closes then a steady climb: the older window is flat
        // (RSI 100 by the zero-loss rule) and so is the newer one.
        let mut closes = vec![10.0; 15];
        closes.extend((1..=5).map(|i| 10.0 + i as f64));
        assert!(rsi_slope(&closes, 5).abs() < 1e-10);

        // Falling older window, rising newer one => positive slope.
        let mut closes: Vec<f64> = (0..15).map(|i| 50.0 - i as f64).collect();
        closes.extend((1..=15).map(|i| 36.0 + i as f64));
        assert!(rsi_slope(&closes, 5) > 0.0);
    }
}
