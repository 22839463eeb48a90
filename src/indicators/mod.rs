// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the technical indicators computed
// for every price series. Every series function returns a `Vec<Option<f64>>`
// aligned 1:1 with its input: `None` marks a window that is still warming up,
// never a zero or an interpolated value.

pub mod atr;
pub mod bollinger;
pub mod crossover;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod set;
pub mod sma;

pub use crossover::{detect_golden_cross, CrossSignal};
pub use set::{IndicatorRow, IndicatorSet};

/// Convert a warm-up-as-`None` series into the NaN-marker representation.
#[cfg(test)]
pub fn to_nan_series(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// Convert a NaN-marker series back into the `None` representation. The
/// commodity CSV parser produces NaN-marked columns and converts them here.
pub fn from_nan_series(series: &[f64]) -> Vec<Option<f64>> {
    series
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect()
}
