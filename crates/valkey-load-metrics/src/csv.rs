use std::io::{self, Write};

use valkey_load_core::LatencySummary;

use crate::bucket::Counters;

pub const CSV_HEADER: &str = "timestamp,request_sec,p50_usec,p90_usec,p95_usec,p99_usec,p99_9_usec,p99_99_usec,p99_999_usec,p100_usec,avg_usec,requests_total_failed,requests_moved,requests_clusterdown,client_disconnects";

/// One emitted data row: a single worker's flushed interval (single-process
/// mode) or the orchestrator's cross-worker aggregate (multi-process mode).
pub struct IntervalReport {
    pub timestamp_unix_secs: u64,
    pub duration_secs: f64,
    pub latencies_ms: Vec<f64>,
    pub counters: Counters,
}

impl IntervalReport {
    pub fn request_sec(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.counters.requests as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

pub fn write_header(w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "{CSV_HEADER}")
}

/// Writes exactly one 15-field CSV row for `report`. When the interval had
/// zero successes the latency fields are all 0 but the error counters still
/// reflect failures.
pub fn write_row(w: &mut impl Write, report: &IntervalReport) -> io::Result<()> {
    let summary = LatencySummary::from_latencies_ms(&report.latencies_ms);
    writeln!(
        w,
        "{},{:.6},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        report.timestamp_unix_secs,
        report.request_sec(),
        summary.p50_usec,
        summary.p90_usec,
        summary.p95_usec,
        summary.p99_usec,
        summary.p99_9_usec,
        summary.p99_99_usec,
        summary.p99_999_usec,
        summary.p100_usec,
        summary.avg_usec,
        report.counters.errors,
        report.counters.moved,
        report.counters.clusterdown,
        report.counters.disconnects,
    )
}
