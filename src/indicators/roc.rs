// =============================================================================
// Rate of Change (ROC) — latest value plus 0..100 rescale
// =============================================================================
//
//   ROC(n)     = 100 * (close_now - close_n_ago) / close_n_ago
//   normalised = (clamp(ROC, -100, 100) + 100) / 2
//
// The normalised form lets ROC share a 0..100 scale with RSI and %K in the
// momentum score.

/// ROC of the latest close against the close `period` bars earlier.
///
/// Returns 0 with insufficient history or a zero reference close.
pub fn current_roc(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 0.0;
    }
    let current = closes[closes.len() - 1];
    let past = closes[closes.len() - period - 1];
    if past == 0.0 {
        return 0.0;
    }
    ((current - past) / past) * 100.0
}

/// Clamp ROC to [-100, 100] and rescale to [0, 100] (0 => 50).
pub fn normalize_roc(roc: f64) -> f64 {
    (roc.clamp(-100.0, 100.0) + 100.0) / 2.0
}
