use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, lock-free counters touched by every dispatch thread in a worker
/// process. Spec's cooperative-scheduling model makes these updates atomic
/// between suspension points for free; a thread-based port must use real
/// atomics instead.
#[derive(Default)]
pub struct SharedCounters {
    /// Successful requests only — bumped by `add_latency`, never by a
    /// failure. Mirrors `BenchmarkStats.requests_completed` in the original,
    /// which `add_error` leaves untouched.
    pub requests_completed: AtomicU64,
    /// Every dispatched request, success or failure. Drives the connection-
    /// index/key-generation counter and the quota stop condition so a run
    /// of failures still advances load distribution and still terminates
    /// in quota mode, rather than spinning forever on the same connection
    /// and key the way `requests_completed` alone would.
    pub total_attempts: AtomicU64,
    pub errors: AtomicU64,
    pub moved: AtomicU64,
    pub clusterdown: AtomicU64,
    pub disconnects: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CountersSnapshot {
    pub requests_completed: u64,
    pub total_attempts: u64,
    pub errors: u64,
    pub moved: u64,
    pub clusterdown: u64,
    pub disconnects: u64,
}

impl SharedCounters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            moved: self.moved.load(Ordering::Relaxed),
            clusterdown: self.clusterdown.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let counters = SharedCounters::default();
        counters.requests_completed.fetch_add(5, Ordering::Relaxed);
        counters.errors.fetch_add(2, Ordering::Relaxed);
        let snap = counters.snapshot();
        assert_eq!(snap.requests_completed, 5);
        assert_eq!(snap.errors, 2);
    }
}
