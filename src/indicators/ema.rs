// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (period + 1)
//   EMA_0  = close_0
//   EMA_t  = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The series is seeded with the first value, so there is no warm-up: every
// entry is `Some` for a valid period.
// =============================================================================

/// Compute the EMA series for `values` and look-back `period`.
///
/// The output is aligned 1:1 with the input.
///
/// # Edge cases
/// - `period == 0` => every entry is `None` (alpha would exceed 1)
/// - `period == 1` => alpha = 1, the input is returned unchanged
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    ema_values(values, period).into_iter().map(Some).collect()
}

/// Raw EMA without the `Option` wrapper. Used by MACD, which chains EMAs.
///
/// Callers must pass `period >= 1`.
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());

    let mut prev: Option<f64> = None;
    for &value in values {
        let ema = match prev {
            None => value,
            Some(p) => value * alpha + p * (1.0 - alpha),
        };
        result.push(ema);
        prev = Some(ema);
    }
    result
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_zero() {
        assert_eq!(calculate_ema(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn ema_period_one_is_identity() {
        let values = vec![10.0, 12.5, 9.75, 11.0, 100.0];
        let out = calculate_ema(&values, 1);
        assert_eq!(out, values.iter().map(|v| Some(*v)).collect::<Vec<_>>());
    }

    #[test]
    fn ema_never_null_and_seeded_by_first_value() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = calculate_ema(&values, 5);
        assert_eq!(out.len(), values.len());
        assert!(out.iter().all(Option::is_some));
        assert_eq!(out[0], Some(1.0));
    }

    #[test]
    fn ema_known_values() {
        // alpha = 2 / 6 = 1/3
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = calculate_ema(&values, 5);

        let alpha = 2.0 / 6.0;
        let mut expected = values[0];
        for (i, &v) in values.iter().enumerate().skip(1) {
            expected = v * alpha + expected * (1.0 - alpha);
            let got = out[i].unwrap();
            assert!((got - expected).abs() < 1e-10, "got {got}, expected {expected}");
        }
    }

    #[test]
    fn ema_flat_series_stays_flat() {
        let out = calculate_ema(&[42.0; 30], 12);
        for v in out {
            assert!((v.unwrap() - 42.0).abs() < 1e-12);
        }
    }
}
