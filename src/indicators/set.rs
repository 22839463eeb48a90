// =============================================================================
// IndicatorSet — the fixed indicator bundle persisted per price bar
// =============================================================================
//
// Columns: SMA 20/50/200, EMA 12/26, RSI 14, MACD + signal,
// Bollinger(20, 2.0) upper/middle/lower, ATR 14.
//
// `rows[i]` always belongs to input bar `i`; the set never drops or pads rows.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::{atr, bollinger, ema, macd, rsi, sma};
use crate::types::{closes, PriceBar};

/// Indicator values for one bar. `None` means the window is still warming up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub atr_14: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorSet {
    /// Compute the full set over a bar series.
    pub fn compute(bars: &[PriceBar]) -> Self {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        Self::from_columns(&highs, &lows, &closes(bars))
    }

    /// Compute the full set over aligned columns. Close-only data (such as
    /// the annual commodity table) can pass the closes for all three.
    pub fn from_columns(highs: &[f64], lows: &[f64], closes: &[f64]) -> Self {
        let sma_20 = sma::calculate_sma(closes, 20);
        let sma_50 = sma::calculate_sma(closes, 50);
        let sma_200 = sma::calculate_sma(closes, 200);
        let ema_12 = ema::calculate_ema(closes, 12);
        let ema_26 = ema::calculate_ema(closes, 26);
        let rsi_14 = rsi::calculate_rsi(closes, rsi::DEFAULT_PERIOD);
        let macd = macd::calculate_default_macd(closes);
        let bands = bollinger::calculate_bollinger(
            closes,
            bollinger::DEFAULT_PERIOD,
            bollinger::DEFAULT_NUM_STD,
        );
        let atr_14 = atr::calculate_atr(highs, lows, closes, atr::DEFAULT_PERIOD);

        let rows = (0..closes.len())
            .map(|i| IndicatorRow {
                sma_20: sma_20[i],
                sma_50: sma_50[i],
                sma_200: sma_200[i],
                ema_12: ema_12[i],
                ema_26: ema_26[i],
                rsi_14: rsi_14[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                bollinger_upper: bands.upper[i],
                bollinger_middle: bands.middle[i],
                bollinger_lower: bands.lower[i],
                atr_14: atr_14.get(i).copied().flatten(),
            })
            .collect();

        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract one column by projection, e.g. `set.column(|r| r.sma_50)`.
    pub fn column(&self, pick: impl Fn(&IndicatorRow) -> Option<f64>) -> Vec<Option<f64>> {
        self.rows.iter().map(pick).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn bars(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.2).sin() * 10.0 + i as f64 * 0.05;
                PriceBar::new(start + Duration::days(i as i64), c - 0.5, c + 1.5, c - 1.5, c)
            })
            .collect()
    }

    #[test]
    fn set_is_aligned_with_input() {
        for n in [0, 1, 13, 14, 20, 50, 210] {
            let set = IndicatorSet::compute(&bars(n));
            assert_eq!(set.len(), n);
        }
    }

    #[test]
    fn set_warmup_boundaries() {
        let set = IndicatorSet::compute(&bars(250));
        let first_some = |col: Vec<Option<f64>>| col.iter().position(Option::is_some);

        assert_eq!(first_some(set.column(|r| r.sma_20)), Some(19));
        assert_eq!(first_some(set.column(|r| r.sma_50)), Some(49));
        assert_eq!(first_some(set.column(|r| r.sma_200)), Some(199));
        assert_eq!(first_some(set.column(|r| r.ema_12)), Some(0));
        assert_eq!(first_some(set.column(|r| r.ema_26)), Some(0));
        assert_eq!(first_some(set.column(|r| r.rsi_14)), Some(14));
        assert_eq!(first_some(set.column(|r| r.macd)), Some(0));
        assert_eq!(first_some(set.column(|r| r.macd_signal)), Some(0));
        assert_eq!(first_some(set.column(|r| r.bollinger_middle)), Some(19));
        assert_eq!(first_some(set.column(|r| r.atr_14)), Some(13));
    }

    #[test]
    fn set_middle_band_matches_sma_20() {
        let set = IndicatorSet::compute(&bars(60));
        for row in &set.rows {
            assert_eq!(row.bollinger_middle, row.sma_20);
        }
    }

    #[test]
    fn set_from_close_only_columns() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let set = IndicatorSet::from_columns(&closes, &closes, &closes);
        assert_eq!(set.len(), 30);
        // With high == low == close the true range is the close-to-close move.
        assert!((set.rows[29].atr_14.unwrap() - 1.0).abs() < 1e-12);
    }
}
