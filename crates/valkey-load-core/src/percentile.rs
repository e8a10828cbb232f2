/// Nearest-rank percentile over an already-sorted slice of millisecond
/// latencies, truncated (floor toward zero) to integer microseconds.
///
/// No interpolation — this rule is deliberate and must not be replaced
/// with rounding, which would change behavior at exact-boundary inputs.
pub fn percentile_usec(sorted_ms: &[f64], p: f64) -> u64 {
    if sorted_ms.is_empty() {
        return 0;
    }
    let len = sorted_ms.len();
    let mut idx = ((len as f64) * p / 100.0).floor() as usize;
    if idx >= len {
        idx = len - 1;
    }
    truncate_to_usec(sorted_ms[idx])
}

/// Truncates a millisecond value to integer microseconds, flooring toward
/// zero.
pub fn truncate_to_usec(ms: f64) -> u64 {
    (ms * 1000.0) as u64
}

/// A full latency summary for one interval or the whole run: the standard
/// percentile ladder plus max/mean, all in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50_usec: u64,
    pub p90_usec: u64,
    pub p95_usec: u64,
    pub p99_usec: u64,
    pub p99_9_usec: u64,
    pub p99_99_usec: u64,
    pub p99_999_usec: u64,
    pub p100_usec: u64,
    pub avg_usec: u64,
}

impl LatencySummary {
    /// `latencies_ms` need not be sorted; this sorts a copy.
    pub fn from_latencies_ms(latencies_ms: &[f64]) -> Self {
        if latencies_ms.is_empty() {
            return Self::default();
        }
        let mut sorted = latencies_ms.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("latency must not be NaN"));
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        Self {
            p50_usec: percentile_usec(&sorted, 50.0),
            p90_usec: percentile_usec(&sorted, 90.0),
            p95_usec: percentile_usec(&sorted, 95.0),
            p99_usec: percentile_usec(&sorted, 99.0),
            p99_9_usec: percentile_usec(&sorted, 99.9),
            p99_99_usec: percentile_usec(&sorted, 99.99),
            p99_999_usec: percentile_usec(&sorted, 99.999),
            p100_usec: truncate_to_usec(*sorted.last().expect("checked non-empty")),
            avg_usec: truncate_to_usec(mean),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_yields_zero() {
        assert_eq!(percentile_usec(&[], 50.0), 0);
    }

    #[test]
    fn truncates_not_rounds() {
        // 1.9999 ms -> 1999 usec, never 2000
        assert_eq!(truncate_to_usec(1.9999), 1999);
    }

    #[test]
    fn single_sample_all_percentiles_equal() {
        let summary = LatencySummary::from_latencies_ms(&[2.5]);
        assert_eq!(summary.p50_usec, summary.p100_usec);
        assert_eq!(summary.p100_usec, 2500);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let data: Vec<f64> = (1..=1000).map(|i| i as f64 / 10.0).collect();
        let s = LatencySummary::from_latencies_ms(&data);
        assert!(s.p50_usec <= s.p90_usec);
        assert!(s.p90_usec <= s.p95_usec);
        assert!(s.p95_usec <= s.p99_usec);
        assert!(s.p99_usec <= s.p99_9_usec);
        assert!(s.p99_9_usec <= s.p99_99_usec);
        assert!(s.p99_99_usec <= s.p99_999_usec);
        assert!(s.p99_999_usec <= s.p100_usec);
    }

    #[test]
    fn idx_never_out_of_bounds_at_p100() {
        let data = vec![1.0, 2.0, 3.0];
        assert_eq!(percentile_usec(&data, 100.0), truncate_to_usec(3.0));
    }
}
