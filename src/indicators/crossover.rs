// =============================================================================
// Golden Cross detection
// =============================================================================
//
// A golden cross occurs at bar `t` when the fast average was at or below the
// slow average on the previous bar and is strictly above it at `t`:
//
//   fast_{t-1} <= slow_{t-1}  &&  fast_t > slow_t
//
// Bars where either average is still warming up never form a cross.

use serde::Serialize;

/// Fixed confidence attached to a detected golden cross.
pub const GOLDEN_CROSS_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSignal<T> {
    pub pattern: &'static str,
    pub at: T,
    pub fast: f64,
    pub slow: f64,
    pub confidence: f64,
}

/// Return the most recent golden cross in the series, if any.
///
/// `timestamps`, `fast` and `slow` must be aligned and in ascending order.
pub fn detect_golden_cross<T: Clone>(
    timestamps: &[T],
    fast: &[Option<f64>],
    slow: &[Option<f64>],
) -> Option<CrossSignal<T>> {
    let len = timestamps.len().min(fast.len()).min(slow.len());

    (1..len).rev().find_map(|t| {
        let (prev_fast, prev_slow) = (fast[t - 1]?, slow[t - 1]?);
        let (cur_fast, cur_slow) = (fast[t]?, slow[t]?);
        if prev_fast <= prev_slow && cur_fast > cur_slow {
            Some(CrossSignal {
                pattern: "Golden Cross",
                at: timestamps[t].clone(),
                fast: cur_fast,
                slow: cur_slow,
                confidence: GOLDEN_CROSS_CONFIDENCE,
            })
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_most_recent_cross() {
        let ts = [1, 2, 3, 4, 5, 6];
        let fast = [Some(1.0), Some(3.0), Some(1.0), Some(1.0), Some(4.0), Some(5.0)];
        let slow = [Some(2.0), Some(2.0), Some(2.0), Some(2.0), Some(2.0), Some(2.0)];
        let sig = detect_golden_cross(&ts, &fast, &slow).unwrap();
        assert_eq!(sig.at, 5);
        assert_eq!(sig.fast, 4.0);
        assert_eq!(sig.slow, 2.0);
        assert_eq!(sig.confidence, GOLDEN_CROSS_CONFIDENCE);
    }

    #[test]
    fn touching_then_crossing_counts() {
        let ts = ["a", "b"];
        let sig = detect_golden_cross(&ts, &[Some(2.0), Some(2.1)], &[Some(2.0), Some(2.0)]);
        assert_eq!(sig.map(|s| s.at), Some("b"));
    }

    #[test]
    fn warmup_bars_never_cross() {
        let ts = [1, 2, 3];
        let fast = [Some(1.0), Some(3.0), Some(4.0)];
        let slow = [None, Some(2.0), Some(2.0)];
        assert!(detect_golden_cross(&ts, &fast, &slow).is_none());
    }

    #[test]
    fn death_cross_is_ignored() {
        let ts = [1, 2];
        let fast = [Some(3.0), Some(1.0)];
        let slow = [Some(2.0), Some(2.0)];
        assert!(detect_golden_cross(&ts, &fast, &slow).is_none());
    }
}
