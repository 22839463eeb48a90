// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the rolling sample standard
// deviation (n - 1 denominator) over the same window.

use super::sma::calculate_sma;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_NUM_STD: f64 = 2.0;

/// The three bands, each aligned 1:1 with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands for the given closing prices.
///
/// Entries before the window is full are `None` on all three bands. A window
/// of one point has no spread, so the bands collapse onto the middle.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let std = rolling_std(closes, period);

    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];
    for i in 0..closes.len() {
        if let (Some(mid), Some(sd)) = (middle[i], std[i]) {
            upper[i] = Some(mid + num_std * sd);
            lower[i] = Some(mid - num_std * sd);
        }
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Rolling sample standard deviation aligned with the input.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    if period == 1 {
        for slot in out.iter_mut() {
            *slot = Some(0.0);
        }
        return out;
    }

    let period_f = period as f64;
    for (i, window) in values.windows(period).enumerate() {
        let mean = window.iter().sum::<f64>() / period_f;
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period_f - 1.0);
        out[i + period - 1] = Some(variance.sqrt());
    }
    out
}
