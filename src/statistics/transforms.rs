// =============================================================================
// Series transforms — returns, normalisation, range and volume summaries
// =============================================================================

use serde::Serialize;

use super::summary::mean;
use crate::error::AnalyticsError;
use crate::types::PriceBar;

/// Day-over-day percent change, aligned with `closes`.
///
/// The first entry is 0.0, as is any entry whose previous close is 0.0.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let ret = match i.checked_sub(1).map(|p| closes[p]) {
            Some(prev) if prev != 0.0 => (close - prev) / prev * 100.0,
            _ => 0.0,
        };
        out.push(ret);
    }
    out
}

/// Rebase a series so that the base point equals 100.
///
/// The base defaults to the first point. An empty series yields an empty
/// result.
///
/// # Errors
/// - [`AnalyticsError::BaseNotFound`] when `base` is not in the series.
/// - [`AnalyticsError::InvalidInput`] when the base price is 0.
pub fn normalize<T>(points: &[(T, f64)], base: Option<&T>) -> Result<Vec<f64>, AnalyticsError>
where
    T: PartialEq + std::fmt::Display,
{
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let base_price = match base {
        None => points[0].1,
        Some(ts) => points
            .iter()
            .find(|(t, _)| t == ts)
            .map(|(_, p)| *p)
            .ok_or_else(|| AnalyticsError::BaseNotFound(ts.to_string()))?,
    };

    if base_price == 0.0 {
        return Err(AnalyticsError::invalid("base price is zero"));
    }

    Ok(points.iter().map(|(_, p)| p / base_price * 100.0).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRange {
    pub average_daily_range: f64,
    pub max_high: f64,
    pub min_low: f64,
    pub total_range: f64,
}

/// High/low range summary. `None` for an empty series.
pub fn price_range(bars: &[PriceBar]) -> Option<PriceRange> {
    if bars.is_empty() {
        return None;
    }

    let ranges: Vec<f64> = bars.iter().map(|b| b.high - b.low).collect();
    let max_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    Some(PriceRange {
        average_daily_range: mean(&ranges),
        max_high,
        min_low,
        total_range: max_high - min_low,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeStats {
    pub avg_volume: Option<u64>,
    pub max_volume: Option<u64>,
    pub min_volume: Option<u64>,
}

/// Volume summary over bars that carry a volume. The average is truncated to
/// an integer. All fields are `None` when no bar has a volume.
pub fn volume_stats(bars: &[PriceBar]) -> VolumeStats {
    let volumes: Vec<u64> = bars.iter().filter_map(|b| b.volume).collect();
    if volumes.is_empty() {
        return VolumeStats::default();
    }

    let total: u128 = volumes.iter().map(|&v| v as u128).sum();
    VolumeStats {
        avg_volume: Some((total / volumes.len() as u128) as u64),
        max_volume: volumes.iter().copied().max(),
        min_volume: volumes.iter().copied().min(),
    }
}
