// =============================================================================
// Average True Range (ATR) — Simple Rolling Mean
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR_0 = H - L                                    (no previous close)
//   TR_t = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the simple mean of the trailing `period` TR values. The first
// `period - 1` entries are `None`.
//
// Default period: 14
// =============================================================================

use super::sma::calculate_sma;

pub const DEFAULT_PERIOD: usize = 14;

/// True range per bar. The three columns must be aligned; extra trailing
/// entries in a longer column are ignored.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let len = highs.len().min(lows.len()).min(closes.len());
    let mut tr = Vec::with_capacity(len);

    for i in 0..len {
        let hl = highs[i] - lows[i];
        if i == 0 {
            tr.push(hl);
            continue;
        }
        let prev_close = closes[i - 1];
        let hc = (highs[i] - prev_close).abs();
        let lc = (lows[i] - prev_close).abs();
        tr.push(hl.max(hc).max(lc));
    }
    tr
}

/// Compute the ATR series over aligned high / low / close columns.
pub fn calculate_atr(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Vec<Option<f64>> {
    calculate_sma(&true_range(highs, lows, closes), period)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atr_flat_series_is_zero_after_warmup() {
        let flat = vec![50.0; 30];
        let atr = calculate_atr(&flat, &flat, &flat, DEFAULT_PERIOD);
        assert_eq!(atr.len(), 30);
        assert!(atr[..13].iter().all(Option::is_none));
        for v in &atr[13..] {
            assert_eq!(*v, Some(0.0));
        }
    }

    #[test]
    fn atr_first_bar_uses_high_minus_low() {
        let tr = true_range(&[105.0], &[95.0], &[100.0]);
        assert_eq!(tr, vec![10.0]);
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap up: |115 - 95| = 20 > 115 - 108 = 7
        let highs = [105.0, 115.0];
        let lows = [95.0, 108.0];
        let closes = [95.0, 112.0];
        let tr = true_range(&highs, &lows, &closes);
        assert_eq!(tr, vec![10.0, 20.0]);
    }

    #[test]
    fn atr_gap_down_uses_low_vs_prev_close() {
        let tr = true_range(&[100.0, 82.0], &[98.0, 80.0], &[100.0, 81.0]);
        assert_eq!(tr[1], 20.0);
    }

    #[test]
    fn atr_known_values() {
        let highs = [10.0, 12.0, 13.0, 12.0];
        let lows = [8.0, 9.0, 11.0, 10.0];
        let closes = [9.0, 11.0, 12.0, 11.0];
        // TR: [2, 3, 2, 2]
        let atr = calculate_atr(&highs, &lows, &closes, 2);
        assert_eq!(atr[0], None);
        assert!((atr[1].unwrap() - 2.5).abs() < 1e-12);
        assert!((atr[2].unwrap() - 2.5).abs() < 1e-12);
        assert!((atr[3].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn atr_constant_range_converges() {
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        for i in 0..30 {
            let base = 100.0 + i as f64 * 0.1;
            highs.push(base + 5.0);
            lows.push(base - 5.0);
            closes.push(base);
        }
        let atr = calculate_atr(&highs, &lows, &closes, 14);
        let last = atr.last().unwrap().unwrap();
        assert!((last - 10.0).abs() < 1.0, "expected ATR near 10.0, got {last}");
    }
}
