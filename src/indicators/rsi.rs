// =============================================================================
// Relative Strength Index (RSI) — Simple Rolling Averages
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Over each trailing window of `period` deltas take the simple mean
//          of the gains and the simple mean of the losses (no Wilder
//          smoothing).
// Step 3: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The first value appears at index `period`, the first close for which
// `period` real deltas exist. Everything before is `None`. A variant that
// counts the missing first delta as a zero move would start one bar earlier,
// at `period - 1`; that window holds only `period - 1` observed changes.
// =============================================================================

/// RSI reported when the window has gains but no losses (RS is unbounded).
pub const ZERO_LOSS_RSI: f64 = 100.0;

/// RSI reported when the window has neither gains nor losses.
pub const NO_MOVEMENT_RSI: f64 = 50.0;

/// Default look-back period.
pub const DEFAULT_PERIOD: usize = 14;

/// Compute the RSI series for the given `closes` and `period`.
///
/// The output is aligned 1:1 with `closes`.
///
/// # Edge cases
/// - `period == 0` => every entry is `None`
/// - `closes.len() <= period` => every entry is `None`
/// - zero average loss => [`ZERO_LOSS_RSI`], or [`NO_MOVEMENT_RSI`] when the
///   average gain is zero as well
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    // Delta `j` ends at close `j + 1`, so a window starting at delta `i` ends
    // at close `i + period`.
    for (i, window) in deltas.windows(period).enumerate() {
        let (sum_gain, sum_loss) = window.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
        out[i + period] = Some(rsi_from_averages(sum_gain / period_f, sum_loss / period_f));
    }
    out
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        NO_MOVEMENT_RSI
    } else if avg_loss == 0.0 {
        ZERO_LOSS_RSI
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert_eq!(calculate_rsi(&[1.0, 2.0, 3.0], 0), vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        let out = calculate_rsi(&closes, 14);
        assert_eq!(out.len(), 14);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_warmup_length() {
        let closes: Vec<f64> = (0..30).map(|x| 100.0 + (x as f64).cos()).collect();
        let out = calculate_rsi(&closes, 14);
        assert_eq!(out.len(), 30);
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains_hits_zero_loss_sentinel() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert_eq!(v, ZERO_LOSS_RSI);
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_is_neutral() {
        for v in calculate_rsi(&[100.0; 30], 14).into_iter().flatten() {
            assert_eq!(v, NO_MOVEMENT_RSI);
        }
    }

    #[test]
    fn rsi_known_value() {
        // Deltas over the window: +2, -1, +1 => avg gain 1, avg loss 1/3.
        // RS = 3, RSI = 75.
        let out = calculate_rsi(&[10.0, 12.0, 11.0, 12.0], 3);
        assert_eq!(&out[..3], &[None, None, None]);
        assert!((out[3].unwrap() - 75.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_uses_simple_window_not_wilder() {
        // A single large gain followed by a flat stretch drops out of the
        // window completely once it is older than `period` deltas.
        let mut closes = vec![100.0, 110.0];
        closes.extend(std::iter::repeat(110.0).take(5));
        let out = calculate_rsi(&closes, 3);
        assert_eq!(out[3], Some(ZERO_LOSS_RSI));
        assert_eq!(out[5], Some(NO_MOVEMENT_RSI));
    }
}
