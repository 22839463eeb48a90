// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD      = EMA(fast) - EMA(slow)
//   Signal    = EMA(signal) of MACD
//   Histogram = MACD - Signal
//
// Every EMA is seeded with its first input, so none of the three lines has a
// warm-up period.
// =============================================================================

use super::ema::ema_values;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// The three MACD lines, each aligned 1:1 with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

impl MacdSeries {
    fn empty(len: usize) -> Self {
        Self {
            macd: vec![None; len],
            signal: vec![None; len],
            histogram: vec![None; len],
        }
    }
}

/// Compute MACD with custom periods.
///
/// Any zero period yields all-`None` lines.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal == 0 {
        return MacdSeries::empty(closes.len());
    }

    let fast_ema = ema_values(closes, fast);
    let slow_ema = ema_values(closes, slow);
    let macd: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_values(&macd, signal);

    MacdSeries {
        histogram: macd
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| Some(m - s))
            .collect(),
        macd: macd.into_iter().map(Some).collect(),
        signal: signal_line.into_iter().map(Some).collect(),
    }
}

/// MACD(12, 26, 9).
pub fn calculate_default_macd(closes: &[f64]) -> MacdSeries {
    calculate_macd(closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
