// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   %K = 100 * (close - lowest_low) / (highest_high - lowest_low)
//
// computed over the trailing `period` bars.  %D averages %K over the last
// `period_d` windows, each ending one bar earlier than the previous.
//
// Neutral fallback is 50 whenever the window is short or perfectly flat.

/// High/low/close triple retained for the stochastic windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hlc {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// %K over the trailing `period` bars of `bars` (oldest first).
pub fn stochastic_k(bars: &[Hlc], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return 50.0;
    }

    let window = &bars[bars.len() - period..];
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

    if highest == lowest {
        return 50.0;
    }
    let last_close = window[window.len() - 1].close;
    100.0 * (last_close - lowest) / (highest - lowest)
}

/// %D: mean of %K(`period_k`) over the windows ending 0..`period_d` bars ago.
pub fn stochastic_d(bars: &[Hlc], period_k: usize, period_d: usize) -> f64 {
    if period_k == 0 || period_d == 0 || bars.len() < period_k + period_d - 1 {
        return 50.0;
    }

    let sum: f64 = (0..period_d)
        .map(|offset| {
            let end = bars.len() - offset;
            stochastic_k(&bars[end - period_k..end], period_k)
        })
        .sum();
    sum / period_d as f64
}

/// Per-bar change of %K over the last three bars.
///
/// Both readings use every available bar up to 14, so the slope is already
/// defined during warm-up once five bars exist.
pub fn stochastic_slope(bars: &[Hlc]) -> f64 {
    if bars.len() < 5 {
        return 0.0;
    }
    let now = stochastic_k(bars, bars.len().min(14));
    let older = &bars[..bars.len() - 3];
    let then = stochastic_k(older, older.len().min(14));
    (now - then) / 3.0
}
