// =============================================================================
// Candle Pattern Flags
// =============================================================================
//
// Evaluated against the previous bar of the same group; a group's first bar
// carries no patterns.
//
//   Inside bar  : high <= prev.high && low >= prev.low
//   Outside bar : high >  prev.high && low <  prev.low
//   Pin bar     : one shadow > 2x body while the other is < body / 2
//
// Shadows are measured from the body extremes, not from open or close alone.

use serde::{Deserialize, Serialize};

/// Open/high/low/close of a bar, as retained in regime history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFlags {
    pub inside_bar: bool,
    pub outside_bar: bool,
    pub pin_bar: bool,
}

impl PatternFlags {
    pub fn detect(bar: &Ohlc, prev: Option<&Ohlc>) -> Self {
        let Some(prev) = prev else {
            return Self::default();
        };

        let body = (bar.close - bar.open).abs();
        let upper_shadow = bar.high - bar.open.max(bar.close);
        let lower_shadow = bar.open.min(bar.close) - bar.low;

        Self {
            inside_bar: bar.high <= prev.high && bar.low >= prev.low,
            outside_bar: bar.high > prev.high && bar.low < prev.low,
            pin_bar: (upper_shadow > 2.0 * body && lower_shadow < body / 2.0)
                || (lower_shadow > 2.0 * body && upper_shadow < body / 2.0),
        }
    }

    /// 0.5 baseline, -0.2 inside, +0.1 outside, +0.15 pin; clamped to [0, 1].
    pub fn score(&self) -> f64 {
        let mut score: f64 = 0.5;
        if self.inside_bar {
            score -= 0.2;
        }
        if self.outside_bar {
            score += 0.1;
        }
        if self.pin_bar {
            score += 0.15;
        }
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ohlc(open: f64, high: f64, low: f64, close: f64) -> Ohlc {
        Ohlc {
            open,
            high,
            low,
            close,
        }
    }

    #[test]
    fn first_bar_has_no_patterns() {
        let flags = PatternFlags::detect(&ohlc(10.0, 15.0, 9.9, 10.1), None);
        assert_eq!(flags, PatternFlags::default());
    }

    #[test]
    fn inside_bar_including_equal_extremes() {
        let prev = ohlc(10.0, 12.0, 8.0, 11.0);
        let flags = PatternFlags::detect(&ohlc(10.0, 12.0, 8.0, 11.0), Some(&prev));
        assert!(flags.inside_bar);
        assert!(!flags.outside_bar);
    }

    #[test]
    fn outside_bar_needs_strict_extremes() {
        let prev = ohlc(10.0, 12.0, 8.0, 11.0);
        let flags = PatternFlags::detect(&ohlc(10.0, 13.0, 7.0, 11.0), Some(&prev));
        assert!(flags.outside_bar);
        assert!(!flags.inside_bar);

        let touching = PatternFlags::detect(&ohlc(10.0, 13.0, 8.0, 11.0), Some(&prev));
        assert!(!touching.outside_bar);
    }

    #[test]
    fn pin_bar_long_lower_shadow() {
        let prev = ohlc(10.0, 11.0, 9.0, 10.5);
        // body 0.2 (10.0 -> 10.2), lower shadow 2.0, upper shadow 0.05
        let flags = PatternFlags::detect(&ohlc(10.0, 10.25, 8.0, 10.2), Some(&prev));
        assert!(flags.pin_bar);
    }

    #[test]
    fn balanced_candle_is_not_pin() {
        let prev = ohlc(10.0, 11.0, 9.0, 10.5);
        let flags = PatternFlags::detect(&ohlc(10.0, 11.0, 9.0, 10.5), Some(&prev));
        assert!(!flags.pin_bar);
    }

    #[test]
    fn score_adjustments() {
        assert_eq!(PatternFlags::default().score(), 0.5);
        let inside = PatternFlags {
            inside_bar: true,
            ..Default::default()
        };
        assert!((inside.score() - 0.3).abs() < 1e-12);
        let outside_pin = PatternFlags {
            outside_bar: true,
            pin_bar: true,
            ..Default::default()
        };
        assert!((outside_pin.score() - 0.75).abs() < 1e-12);
    }
}
