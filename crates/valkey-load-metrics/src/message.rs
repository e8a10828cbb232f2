use serde::{Deserialize, Serialize};

use crate::bucket::Counters;

/// Streamed once a second in human mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProgress {
    pub worker_id: usize,
    pub requests_completed: u64,
    pub errors: u64,
    pub recent_latencies_ms: Vec<f64>,
    pub timestamp_unix_secs: u64,
}

/// One flushed interval from one worker, sent in CSV mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvIntervalMsg {
    pub worker_id: usize,
    pub timestamp_unix_secs: u64,
    pub interval_duration_secs: f64,
    pub interval_latencies_ms: Vec<f64>,
    pub interval_requests: u64,
    pub interval_errors: u64,
    pub interval_moved: u64,
    pub interval_clusterdown: u64,
    pub interval_disconnects: u64,
}

impl CsvIntervalMsg {
    pub fn counters(&self) -> Counters {
        Counters {
            requests: self.interval_requests,
            errors: self.interval_errors,
            moved: self.interval_moved,
            clusterdown: self.interval_clusterdown,
            disconnects: self.interval_disconnects,
        }
    }
}

/// Sent once at worker teardown with the worker's full latency history, used
/// to build the cross-worker final summary histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalMsg {
    pub worker_id: usize,
    pub latencies_ms: Vec<f64>,
    pub total_requests: u64,
    pub total_errors: u64,
}

/// The three message variants carried over the metrics channel. `Progress`
/// and `CsvInterval` are sent non-blocking and may be silently dropped on a
/// full channel; `Final` uses a blocking send with a timeout so the
/// end-of-run summary is not lost under normal conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Progress(WorkerProgress),
    CsvInterval(CsvIntervalMsg),
    Final(FinalMsg),
}
