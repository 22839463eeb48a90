// =============================================================================
// Statistics Summary
// =============================================================================
//
// Summary metrics over an ordered (timestamp, close) series:
//
//   mean, median, population std-dev
//   min / max close with the timestamp of their first occurrence
//   total change % = (last - first) / first * 100
//   volatility %   = std-dev / mean * 100   (coefficient of variation)
//
// Every division has a defined fallback of 0.0; nothing here can produce an
// infinity from well-formed finite input.
// =============================================================================

use serde::Serialize;
use tracing::trace;

use crate::error::AnalyticsError;

/// Summary record for one series. `T` is the timestamp type of the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary<T> {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_timestamp: T,
    pub max_timestamp: T,
    pub total_change_pct: f64,
    pub volatility_pct: f64,
}

/// Summarise an ordered `(timestamp, close)` series.
///
/// # Errors
/// [`AnalyticsError::InvalidInput`] when `points` is empty.
pub fn summarize<T: Clone>(points: &[(T, f64)]) -> Result<StatisticsSummary<T>, AnalyticsError> {
    let first = points
        .first()
        .ok_or_else(|| AnalyticsError::invalid("No data points provided"))?
        .1;
    let last = points[points.len() - 1].1;

    let closes: Vec<f64> = points.iter().map(|(_, c)| *c).collect();

    // Strict comparisons keep the first occurrence on ties.
    let (mut min_idx, mut max_idx) = (0, 0);
    for (i, &c) in closes.iter().enumerate() {
        if c < closes[min_idx] {
            min_idx = i;
        }
        if c > closes[max_idx] {
            max_idx = i;
        }
    }

    let mean = mean(&closes);
    let std_dev = population_std_dev(&closes);

    let total_change_pct = if closes.len() > 1 && first != 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };

    let volatility_pct = if mean != 0.0 { std_dev / mean * 100.0 } else { 0.0 };

    trace!(
        len = closes.len(),
        mean,
        std_dev,
        total_change_pct,
        "statistics summary computed"
    );

    Ok(StatisticsSummary {
        mean,
        median: median(&closes),
        std_dev,
        min_price: closes[min_idx],
        max_price: closes[max_idx],
        min_timestamp: points[min_idx].0.clone(),
        max_timestamp: points[max_idx].0.clone(),
        total_change_pct,
        volatility_pct,
    })
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median (average of the two middle values for even lengths); 0.0 for an
/// empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation (n denominator); 0.0 for fewer than two
/// values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Compound annual growth rate in percent.
///
/// `((end / start)^(1 / years) - 1) * 100`, or 0.0 unless `years > 0` and
/// `start > 0`.
pub fn cagr(start_price: f64, end_price: f64, years: f64) -> f64 {
    if years <= 0.0 || start_price <= 0.0 {
        return 0.0;
    }
    ((end_price / start_price).powf(1.0 / years) - 1.0) * 100.0
}
