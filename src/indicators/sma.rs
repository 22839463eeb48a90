// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_t = mean(close_{t-period+1} .. close_t)
//
// The output is aligned 1:1 with the input. The first `period - 1` entries are
// `None` because the window is not yet populated.
// =============================================================================

/// Compute the SMA series for `values` over a trailing window of `period`.
///
/// # Edge cases
/// - `period == 0` => every entry is `None`
/// - `values.len() < period` => every entry is `None`
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let period_f = period as f64;
    for (i, window) in values.windows(period).enumerate() {
        out[i + period - 1] = Some(window.iter().sum::<f64>() / period_f);
    }
    out
}
