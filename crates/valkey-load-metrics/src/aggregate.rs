use std::time::Duration;

use crate::bucket::Counters;
use crate::csv::IntervalReport;
use crate::message::CsvIntervalMsg;

/// Combines one same-numbered interval from every worker process into the
/// single row the orchestrator emits in CSV mode. Latency samples are
/// unioned so percentiles are computed across the whole fleet rather than
/// per worker; counters are summed; duration is the mean of the workers'
/// own interval durations (workers flush on their own clocks and drift
/// slightly out of phase with one another).
#[derive(Debug, Default)]
pub struct AggregatedInterval {
    pub timestamp_unix_secs: u64,
    latencies_ms: Vec<f64>,
    counters: Counters,
    duration_secs_sum: f64,
    workers_seen: u32,
}

impl AggregatedInterval {
    pub fn new(timestamp_unix_secs: u64) -> Self {
        Self { timestamp_unix_secs, ..Default::default() }
    }

    pub fn absorb(&mut self, msg: &CsvIntervalMsg) {
        self.latencies_ms.extend_from_slice(&msg.interval_latencies_ms);
        let c = msg.counters();
        self.counters.requests += c.requests;
        self.counters.errors += c.errors;
        self.counters.moved += c.moved;
        self.counters.clusterdown += c.clusterdown;
        self.counters.disconnects += c.disconnects;
        self.duration_secs_sum += msg.interval_duration_secs;
        self.workers_seen += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.workers_seen == 0
    }

    fn mean_duration_secs(&self) -> f64 {
        if self.workers_seen > 0 {
            self.duration_secs_sum / self.workers_seen as f64
        } else {
            0.0
        }
    }

    pub fn into_report(self) -> IntervalReport {
        let duration_secs = self.mean_duration_secs();
        IntervalReport {
            timestamp_unix_secs: self.timestamp_unix_secs,
            duration_secs,
            latencies_ms: self.latencies_ms,
            counters: self.counters,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.mean_duration_secs().max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(worker_id: usize, duration_secs: f64, latencies: Vec<f64>, requests: u64) -> CsvIntervalMsg {
        CsvIntervalMsg {
            worker_id,
            timestamp_unix_secs: 1000,
            interval_duration_secs: duration_secs,
            interval_latencies_ms: latencies,
            interval_requests: requests,
            interval_errors: 0,
            interval_moved: 0,
            interval_clusterdown: 0,
            interval_disconnects: 0,
        }
    }

    #[test]
    fn absorbs_samples_and_sums_counters() {
        let mut agg = AggregatedInterval::new(1000);
        agg.absorb(&msg(0, 1.0, vec![1.0, 2.0], 2));
        agg.absorb(&msg(1, 1.0, vec![3.0], 1));
        let report = agg.into_report();
        assert_eq!(report.latencies_ms.len(), 3);
        assert_eq!(report.counters.requests, 3);
    }

    #[test]
    fn duration_is_mean_across_workers() {
        let mut agg = AggregatedInterval::new(1000);
        agg.absorb(&msg(0, 1.0, vec![], 0));
        agg.absorb(&msg(1, 3.0, vec![], 0));
        assert_eq!(agg.mean_duration_secs(), 2.0);
    }

    #[test]
    fn empty_before_any_absorb() {
        let agg = AggregatedInterval::new(0);
        assert!(agg.is_empty());
    }
}
