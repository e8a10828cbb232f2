use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use valkey_load_core::Config;
use valkey_load_metrics::csv;
use valkey_load_metrics::{AggregatedInterval, Counters, CsvIntervalMsg, Message, MetricsChannel, RunSummary};

use crate::report;

const METRICS_CHANNEL_CAPACITY: usize = 1000;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct WorkerHandle {
    worker_id: usize,
    child: Child,
    stdin: Option<ChildStdin>,
}

/// Plans, spawns, and multiplexes `num_processes` worker subprocesses: the
/// orchestrator side of the hierarchy in spec §4.4. Each worker is a
/// re-exec of this same binary with `WORKER_ENV_VAR` set in its
/// environment; its JSON-lines stdout is this process's half of the
/// cross-process metrics transport, fed into the same bounded
/// `MetricsChannel` an in-process multi-threaded port would use directly.
pub fn run(base_config: Config) -> i32 {
    let plans = base_config.plan_workers();
    let n = plans.len();
    let channel = MetricsChannel::new(METRICS_CHANNEL_CAPACITY);

    let exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: could not resolve current executable: {e}");
            return 1;
        }
    };

    let mut workers = Vec::with_capacity(n);
    let mut readers = Vec::with_capacity(n);
    for (worker_id, plan) in plans.iter().enumerate() {
        match spawn_worker(&exe, worker_id, plan, channel.clone()) {
            Ok((handle, reader)) => {
                workers.push(handle);
                readers.push(reader);
            }
            Err(e) => {
                eprintln!("error: failed to spawn worker {worker_id}: {e}");
                for w in &mut workers {
                    let _ = w.child.kill();
                }
                return 1;
            }
        }
    }

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown_requested.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "failed to install signal handler");
        }
    }

    let csv_mode = base_config.csv_interval_sec.is_some();
    let csv_interval = Duration::from_secs(base_config.csv_interval_sec.unwrap_or(1).max(1));
    if csv_mode {
        let mut out = std::io::stdout();
        let _ = csv::write_header(&mut out);
    }

    let run_start = Instant::now();
    let mut worker_totals: HashMap<usize, (u64, u64)> = HashMap::new();
    let mut window_latencies: Vec<f64> = Vec::new();
    let mut pending_interval: HashMap<usize, CsvIntervalMsg> = HashMap::new();
    let mut interval_start = Instant::now();
    let mut final_latencies: Vec<f64> = Vec::new();
    let mut final_counters = Counters::default();
    let mut shutdown_deadline: Option<Instant> = None;
    let mut any_progress_printed = false;

    loop {
        if let Some(msg) = channel.recv_timeout(Duration::from_millis(100)) {
            absorb(
                msg,
                &mut worker_totals,
                &mut window_latencies,
                &mut pending_interval,
                &mut final_latencies,
                &mut final_counters,
            );
        }

        if !csv_mode && !window_latencies.is_empty() {
            let total_completed: u64 = worker_totals.values().map(|(c, _)| *c).sum();
            let total_errors: u64 = worker_totals.values().map(|(_, e)| *e).sum();
            report::print_progress_line(total_completed, total_errors, &window_latencies);
            window_latencies.clear();
            any_progress_printed = true;
        }

        if csv_mode && !pending_interval.is_empty() {
            let all_reported = pending_interval.len() >= n;
            let due = interval_start.elapsed() >= csv_interval;
            if all_reported || due {
                emit_aggregated_row(&pending_interval);
                pending_interval.clear();
                interval_start = Instant::now();
            }
        }

        if shutdown_requested.load(Ordering::SeqCst) && shutdown_deadline.is_none() {
            shutdown_deadline = Some(Instant::now() + SHUTDOWN_GRACE);
            // Dropping our handle to each child's stdin closes the pipe;
            // the worker's stdin-watcher thread observes EOF and flips its
            // local shutdown flag.
            for w in &mut workers {
                w.stdin.take();
            }
        }
        if let Some(deadline) = shutdown_deadline {
            if Instant::now() >= deadline {
                for w in &mut workers {
                    let _ = w.child.kill();
                }
                break;
            }
        }

        let all_exited = workers.iter_mut().all(|w| matches!(w.child.try_wait(), Ok(Some(_))));
        if all_exited {
            break;
        }
    }

    for msg in channel.drain() {
        absorb(
            msg,
            &mut worker_totals,
            &mut window_latencies,
            &mut pending_interval,
            &mut final_latencies,
            &mut final_counters,
        );
    }
    channel.close();
    if csv_mode && !pending_interval.is_empty() {
        emit_aggregated_row(&pending_interval);
    }
    if any_progress_printed {
        report::finish_progress_line();
    }

    for reader in readers {
        let _ = reader.join();
    }

    let mut exit_code = 0;
    let clean_shutdown = shutdown_requested.load(Ordering::SeqCst);
    for w in &mut workers {
        match w.child.wait() {
            Ok(status) if !status.success() && !clean_shutdown => {
                eprintln!("error: worker {} exited abnormally: {status}", w.worker_id);
                exit_code = 1;
            }
            Err(e) => {
                eprintln!("error: failed to wait for worker {}: {e}", w.worker_id);
                exit_code = 1;
            }
            _ => {}
        }
    }

    if !csv_mode {
        let elapsed = run_start.elapsed();
        let summary = RunSummary::from_latencies(elapsed, &final_latencies, final_counters);
        print!("{}", summary.render());
    }

    exit_code
}

#[allow(clippy::too_many_arguments)]
fn absorb(
    msg: Message,
    worker_totals: &mut HashMap<usize, (u64, u64)>,
    window_latencies: &mut Vec<f64>,
    pending_interval: &mut HashMap<usize, CsvIntervalMsg>,
    final_latencies: &mut Vec<f64>,
    final_counters: &mut Counters,
) {
    match msg {
        Message::Progress(p) => {
            worker_totals.insert(p.worker_id, (p.requests_completed, p.errors));
            window_latencies.extend(p.recent_latencies_ms);
        }
        Message::CsvInterval(m) => {
            pending_interval.insert(m.worker_id, m);
        }
        Message::Final(f) => {
            final_latencies.extend(f.latencies_ms);
            final_counters.requests += f.total_requests;
            final_counters.errors += f.total_errors;
        }
    }
}

fn spawn_worker(
    exe: &std::path::Path,
    worker_id: usize,
    plan: &Config,
    channel: MetricsChannel,
) -> std::io::Result<(WorkerHandle, std::thread::JoinHandle<()>)> {
    let mut child = Command::new(exe)
        .env(crate::WORKER_ENV_VAR, "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    let payload = serde_json::to_string(&(worker_id, plan)).expect("config is serializable");
    writeln!(stdin, "{payload}")?;
    stdin.flush()?;

    let stdout = child.stdout.take().expect("piped stdout");
    let reader = std::thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(&line) {
                Ok(Message::Final(msg)) => {
                    channel.send_final(Message::Final(msg), Duration::from_secs(5));
                }
                Ok(other) => {
                    channel.try_send(other);
                }
                Err(e) => tracing::warn!(worker_id, error = %e, "failed to parse worker message"),
            }
        }
    });

    Ok((WorkerHandle { worker_id, child, stdin: Some(stdin) }, reader))
}

fn emit_aggregated_row(pending: &HashMap<usize, CsvIntervalMsg>) {
    let mut agg = AggregatedInterval::new(unix_secs());
    for msg in pending.values() {
        agg.absorb(msg);
    }
    let mut out = std::io::stdout();
    let _ = csv::write_row(&mut out, &agg.into_report());
}

fn unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs()
}
