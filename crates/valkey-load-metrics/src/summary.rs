use std::fmt::Write as _;
use std::time::Duration;

use crate::bucket::Counters;

const HISTOGRAM_EDGES_MS: [f64; 12] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0];

struct Bucket {
    label: String,
    count: u64,
}

/// Final, human-readable report printed at the end of a run.
pub struct RunSummary {
    pub elapsed: Duration,
    pub total_requests: u64,
    pub counters: Counters,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    buckets: Vec<Bucket>,
    bucketed_total: u64,
}

impl RunSummary {
    /// Builds a summary from the full set of latencies seen across every
    /// worker plus the accumulated error counters. `latencies_ms` need not
    /// be sorted.
    pub fn from_latencies(elapsed: Duration, latencies_ms: &[f64], counters: Counters) -> Self {
        let mut sorted = latencies_ms.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("latency must not be NaN"));

        let (min_ms, max_ms, avg_ms) = if sorted.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = sorted.iter().sum();
            (sorted[0], *sorted.last().expect("checked non-empty"), sum / sorted.len() as f64)
        };

        let pick = |p: f64| -> f64 {
            if sorted.is_empty() {
                return 0.0;
            }
            let idx = ((sorted.len() as f64) * p).floor() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };

        let mut bucket_counts = vec![0u64; HISTOGRAM_EDGES_MS.len() + 1];
        for &v in &sorted {
            let slot = HISTOGRAM_EDGES_MS.iter().position(|&edge| v <= edge).unwrap_or(HISTOGRAM_EDGES_MS.len());
            bucket_counts[slot] += 1;
        }
        let buckets = bucket_counts
            .iter()
            .enumerate()
            .map(|(i, &count)| Bucket { label: histogram_label(i), count })
            .collect();

        Self {
            elapsed,
            total_requests: counters.requests,
            counters,
            min_ms,
            avg_ms,
            max_ms,
            p50_ms: pick(0.50),
            p95_ms: pick(0.95),
            p99_ms: pick(0.99),
            buckets,
            bucketed_total: sorted.len() as u64,
        }
    }

    pub fn rps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests as f64 / secs
        } else {
            0.0
        }
    }

    /// Renders the full multi-line report the way it is printed to stdout
    /// at the end of a run.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--------------------------------------------------");
        let _ = writeln!(out, "Total time:      {:.3}s", self.elapsed.as_secs_f64());
        let _ = writeln!(out, "Total requests:  {}", self.total_requests);
        let _ = writeln!(out, "Requests/sec:    {:.2}", self.rps());
        let _ = writeln!(out, "Total errors:    {}", self.counters.errors);
        let _ = writeln!(out, "  moved:         {}", self.counters.moved);
        let _ = writeln!(out, "  clusterdown:   {}", self.counters.clusterdown);
        let _ = writeln!(out, "  disconnects:   {}", self.counters.disconnects);
        let _ = writeln!(out, "Latency (ms):");
        let _ = writeln!(out, "  min:  {:.3}", self.min_ms);
        let _ = writeln!(out, "  avg:  {:.3}", self.avg_ms);
        let _ = writeln!(out, "  max:  {:.3}", self.max_ms);
        let _ = writeln!(out, "  p50:  {:.3}", self.p50_ms);
        let _ = writeln!(out, "  p95:  {:.3}", self.p95_ms);
        let _ = writeln!(out, "  p99:  {:.3}", self.p99_ms);
        let _ = writeln!(out, "Latency distribution:");
        for b in &self.buckets {
            let pct = if self.bucketed_total > 0 { 100.0 * b.count as f64 / self.bucketed_total as f64 } else { 0.0 };
            let _ = writeln!(out, "  {:<10} {:>8} ({:5.2}%)", b.label, b.count, pct);
        }
        let _ = writeln!(out, "--------------------------------------------------");
        out
    }
}

fn histogram_label(slot: usize) -> String {
    if slot == 0 {
        format!("<={}ms", HISTOGRAM_EDGES_MS[0])
    } else if slot < HISTOGRAM_EDGES_MS.len() {
        format!("<={}ms", HISTOGRAM_EDGES_MS[slot])
    } else {
        ">1000ms".to_string()
    }
}
