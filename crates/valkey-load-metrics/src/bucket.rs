use std::time::{Duration, Instant};

use valkey_load_core::ErrorClass;

/// Per-worker, per-CSV-interval accumulator.
///
/// `errors` counts every failed request; `moved` and `clusterdown` are
/// reclassifications layered on top, not a disjoint partition — a MOVED
/// response increments both `errors` and `moved`.
#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub requests: u64,
    pub errors: u64,
    pub moved: u64,
    pub clusterdown: u64,
    pub disconnects: u64,
}

/// A flushed interval's worth of data, ready to be rendered to CSV or
/// shipped to the orchestrator.
#[derive(Debug, Clone)]
pub struct FlushedInterval {
    pub latencies_ms: Vec<f64>,
    pub counters: Counters,
    pub duration: Duration,
}

pub struct IntervalBucket {
    window_start: Instant,
    samples: Vec<f64>,
    counters: Counters,
}

impl IntervalBucket {
    pub fn new(now: Instant) -> Self {
        Self { window_start: now, samples: Vec::new(), counters: Counters::default() }
    }

    /// Records one successful request's latency.
    pub fn add_latency(&mut self, latency_ms: f64) {
        self.samples.push(latency_ms);
        self.counters.requests += 1;
    }

    /// Records one failed request: contributes an error counter and no
    /// latency sample.
    pub fn add_error(&mut self, class: ErrorClass, disconnect: bool) {
        self.counters.requests += 1;
        self.counters.errors += 1;
        match class {
            ErrorClass::Moved => self.counters.moved += 1,
            ErrorClass::ClusterDown => self.counters.clusterdown += 1,
            ErrorClass::General => {}
        }
        if disconnect {
            self.counters.disconnects += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.counters.requests == 0
    }

    pub fn is_due(&self, interval: Duration, now: Instant) -> bool {
        now.duration_since(self.window_start) >= interval
    }

    /// Resets the bucket and returns everything it had accumulated.
    pub fn flush(&mut self, now: Instant) -> FlushedInterval {
        let duration = now.duration_since(self.window_start);
        let latencies_ms = std::mem::take(&mut self.samples);
        let counters = std::mem::replace(&mut self.counters, Counters::default());
        self.window_start = now;
        FlushedInterval { latencies_ms, counters, duration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_adds_sample_no_error() {
        let mut b = IntervalBucket::new(Instant::now());
        b.add_latency(1.5);
        let f = b.flush(Instant::now());
        assert_eq!(f.latencies_ms, vec![1.5]);
        assert_eq!(f.counters.requests, 1);
        assert_eq!(f.counters.errors, 0);
    }

    #[test]
    fn moved_increments_both_general_and_moved() {
        let mut b = IntervalBucket::new(Instant::now());
        b.add_error(ErrorClass::Moved, false);
        let f = b.flush(Instant::now());
        assert_eq!(f.counters.errors, 1);
        assert_eq!(f.counters.moved, 1);
        assert!(f.latencies_ms.is_empty());
    }

    #[test]
    fn flush_resets_bucket() {
        let mut b = IntervalBucket::new(Instant::now());
        b.add_latency(1.0);
        b.flush(Instant::now());
        assert!(b.is_empty());
    }

    #[test]
    fn is_due_after_interval_elapses() {
        let start = Instant::now();
        let b = IntervalBucket::new(start);
        assert!(!b.is_due(Duration::from_secs(1), start));
        assert!(b.is_due(Duration::from_secs(1), start + Duration::from_millis(1100)));
    }
}
