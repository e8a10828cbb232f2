use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use valkey_load_client::StubClient;
use valkey_load_core::Config;
use valkey_load_metrics::csv::{self, IntervalReport};
use valkey_load_metrics::{Counters, Message, RunSummary};
use valkey_load_worker::{CustomCommand, WorkerEngine};

use crate::report;

/// Runs the whole benchmark directly on the calling thread: one
/// `WorkerEngine` with no orchestrator process or IPC hop. This is the
/// `num_processes == 1` path the sample pipeline's flush rule (§4.3) calls
/// "single-worker mode" — CSV rows and the human progress line come
/// straight from this worker's own interval bucket instead of being
/// relayed through the metrics channel and aggregated.
pub fn run(config: Config, custom_command: Option<Box<dyn CustomCommand>>) -> i32 {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "failed to install signal handler");
        }
    }

    let csv_mode = config.csv_interval_sec.is_some();

    let engine = match WorkerEngine::<StubClient>::new(config, 0, shutdown, custom_command) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    if csv_mode {
        let mut out = io::stdout();
        let _ = csv::write_header(&mut out);
    }

    let run_start = Instant::now();
    let final_latencies: Mutex<Vec<f64>> = Mutex::new(Vec::new());

    let sink = |msg: Message| match msg {
        Message::CsvInterval(m) => {
            let report = IntervalReport {
                timestamp_unix_secs: m.timestamp_unix_secs,
                duration_secs: m.interval_duration_secs,
                latencies_ms: m.interval_latencies_ms,
                counters: m.counters(),
            };
            let mut out = io::stdout();
            let _ = csv::write_row(&mut out, &report);
        }
        Message::Progress(p) => {
            report::print_progress_line(p.requests_completed, p.errors, &p.recent_latencies_ms);
        }
        Message::Final(f) => {
            *final_latencies.lock().expect("final latency mutex poisoned") = f.latencies_ms;
        }
    };

    engine.run(&sink);
    let elapsed = run_start.elapsed();
    if !csv_mode {
        report::finish_progress_line();
    }

    if !csv_mode {
        let latencies = final_latencies.into_inner().expect("final latency mutex poisoned");
        let snapshot = engine.counters().snapshot();
        let counters = Counters {
            requests: snapshot.requests_completed,
            errors: snapshot.errors,
            moved: snapshot.moved,
            clusterdown: snapshot.clusterdown,
            disconnects: snapshot.disconnects,
        };
        let summary = RunSummary::from_latencies(elapsed, &latencies, counters);
        print!("{}", summary.render());
    }

    0
}
