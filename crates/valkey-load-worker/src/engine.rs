use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use valkey_load_client::{random_payload, ConnectOptions, KeyGenerator, ServerClient};
use valkey_load_core::{BenchError, Command, Config, ErrorClass, Result};
use valkey_load_metrics::{CsvIntervalMsg, FinalMsg, IntervalBucket, Message, WorkerProgress};
use valkey_load_rate::RateController;

use crate::counters::SharedCounters;
use crate::custom_command::CustomCommand;

enum Dispatch {
    Set,
    Get,
    Custom(Box<dyn CustomCommand>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quota,
    Deadline,
    Shutdown,
}

fn unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs()
}

/// Owns a worker's connection pool and runs its `num_threads` dispatch
/// loops. One engine instance is exactly one worker process's worth of
/// state; nothing here is shared across workers.
pub struct WorkerEngine<C: ServerClient + 'static> {
    worker_id: usize,
    config: Config,
    connections: Vec<Mutex<C>>,
    rate_controller: Mutex<RateController>,
    counters: Arc<SharedCounters>,
    shutdown: Arc<AtomicBool>,
    full_latencies: Mutex<Vec<f64>>,
    bucket: Mutex<IntervalBucket>,
    report_interval: Duration,
    dispatch: Dispatch,
    deadline: Option<Instant>,
    quota: u64,
}

impl<C: ServerClient + 'static> WorkerEngine<C> {
    pub fn new(
        config: Config,
        worker_id: usize,
        shutdown: Arc<AtomicBool>,
        custom_command: Option<Box<dyn CustomCommand>>,
    ) -> Result<Self> {
        let opts = ConnectOptions {
            addresses: vec![(config.host.clone(), config.port)],
            use_tls: config.use_tls,
            read_from_replica: config.read_from_replica,
            request_timeout_ms: config.request_timeout_ms,
            is_cluster: config.is_cluster,
        };

        let mut connections = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            let conn = C::connect(&opts).map_err(|e| BenchError::Connection(e.to_string()))?;
            connections.push(Mutex::new(conn));
        }

        let dispatch = match custom_command {
            Some(cmd) => Dispatch::Custom(cmd),
            None if config.command == Command::Get => Dispatch::Get,
            None => Dispatch::Set,
        };

        let now = Instant::now();
        let deadline =
            if config.test_duration_secs > 0 { Some(now + Duration::from_secs(config.test_duration_secs)) } else { None };
        let quota = if config.test_duration_secs == 0 { config.total_requests } else { u64::MAX };
        let report_interval = Duration::from_secs(config.csv_interval_sec.unwrap_or(1).max(1));
        let rate_controller = RateController::new(&config);

        tracing::info!(worker_id, pool_size = config.pool_size, num_threads = config.num_threads, "worker spawned");

        Ok(Self {
            worker_id,
            config,
            connections,
            rate_controller: Mutex::new(rate_controller),
            counters: Arc::new(SharedCounters::default()),
            shutdown,
            full_latencies: Mutex::new(Vec::new()),
            bucket: Mutex::new(IntervalBucket::new(now)),
            report_interval,
            dispatch,
            deadline,
            quota,
        })
    }

    pub fn counters(&self) -> &Arc<SharedCounters> {
        &self.counters
    }

    /// Runs every dispatch thread to completion and returns why the worker
    /// stopped. `sink` is invoked (from any dispatch thread, and once more
    /// from this thread for the final message) with every metrics message
    /// the worker produces.
    pub fn run(&self, sink: &(dyn Fn(Message) + Send + Sync)) -> StopReason {
        let reason = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.num_threads.max(1))
                .map(|thread_id| scope.spawn(move || self.dispatch_loop(thread_id, sink)))
                .collect();
            let mut reason = StopReason::Quota;
            for handle in handles {
                reason = handle.join().expect("dispatch thread panicked");
            }
            reason
        });

        self.drain_final(sink);
        tracing::info!(worker_id = self.worker_id, ?reason, "worker teardown");
        reason
    }

    fn dispatch_loop(&self, thread_id: usize, sink: &(dyn Fn(Message) + Send + Sync)) -> StopReason {
        let key_gen = KeyGenerator::new(self.config.keyspace_mode());
        let pool_size = self.connections.len().max(1);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return StopReason::Shutdown;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return StopReason::Deadline;
                }
            }
            let attempt_count = self.counters.total_attempts.load(Ordering::Relaxed);
            if self.config.test_duration_secs == 0 && attempt_count >= self.quota {
                return StopReason::Quota;
            }

            let conn_idx = attempt_count as usize % pool_size;
            self.rate_controller.lock().expect("rate controller mutex poisoned").throttle();

            let t_start = Instant::now();
            let key = key_gen.key(thread_id, attempt_count);
            let outcome = self.issue(conn_idx, &key);
            let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
            self.counters.total_attempts.fetch_add(1, Ordering::Relaxed);

            match outcome {
                Ok(()) => self.record_success(latency_ms),
                Err(message) => self.record_failure(&message),
            }

            self.maybe_flush_and_report(Instant::now(), sink);
        }
    }

    fn issue(&self, conn_idx: usize, key: &str) -> std::result::Result<(), String> {
        let mut conn = self.connections[conn_idx].lock().expect("connection mutex poisoned");
        match &self.dispatch {
            Dispatch::Set => {
                let payload = random_payload(self.config.data_size);
                conn.set(key, &payload).map_err(|e| e.to_string())
            }
            Dispatch::Get => conn.get(key).map(|_| ()).map_err(|e| e.to_string()),
            Dispatch::Custom(cmd) => {
                if cmd.execute(&mut *conn) {
                    Ok(())
                } else {
                    Err("custom command returned failure".to_string())
                }
            }
        }
    }

    fn record_success(&self, latency_ms: f64) {
        self.full_latencies.lock().expect("latency history mutex poisoned").push(latency_ms);
        self.bucket.lock().expect("bucket mutex poisoned").add_latency(latency_ms);
        self.counters.requests_completed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, message: &str) {
        let class = ErrorClass::classify(message);
        let disconnect = message.to_lowercase().contains("disconnect");

        self.bucket.lock().expect("bucket mutex poisoned").add_error(class, disconnect);
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        match class {
            ErrorClass::Moved => {
                self.counters.moved.fetch_add(1, Ordering::Relaxed);
            }
            ErrorClass::ClusterDown => {
                self.counters.clusterdown.fetch_add(1, Ordering::Relaxed);
            }
            ErrorClass::General => {}
        }
        if disconnect {
            self.counters.disconnects.fetch_add(1, Ordering::Relaxed);
        }

        if self.config.csv_interval_sec.is_none() {
            tracing::warn!(worker_id = self.worker_id, %class, error = %message, "request failed");
        }
    }

    fn maybe_flush_and_report(&self, now: Instant, sink: &(dyn Fn(Message) + Send + Sync)) {
        let flushed = {
            let mut bucket = self.bucket.lock().expect("bucket mutex poisoned");
            if !bucket.is_due(self.report_interval, now) {
                return;
            }
            bucket.flush(now)
        };

        if self.config.csv_interval_sec.is_some() {
            sink(Message::CsvInterval(CsvIntervalMsg {
                worker_id: self.worker_id,
                timestamp_unix_secs: unix_secs(),
                interval_duration_secs: flushed.duration.as_secs_f64(),
                interval_latencies_ms: flushed.latencies_ms,
                interval_requests: flushed.counters.requests,
                interval_errors: flushed.counters.errors,
                interval_moved: flushed.counters.moved,
                interval_clusterdown: flushed.counters.clusterdown,
                interval_disconnects: flushed.counters.disconnects,
            }));
        } else {
            let snapshot = self.counters.snapshot();
            sink(Message::Progress(WorkerProgress {
                worker_id: self.worker_id,
                requests_completed: snapshot.requests_completed,
                errors: snapshot.errors,
                recent_latencies_ms: flushed.latencies_ms,
                timestamp_unix_secs: unix_secs(),
            }));
        }
    }

    fn drain_final(&self, sink: &(dyn Fn(Message) + Send + Sync)) {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().expect("bucket mutex poisoned");
        if !bucket.is_empty() {
            let flushed = bucket.flush(now);
            drop(bucket);
            if self.config.csv_interval_sec.is_some() {
                sink(Message::CsvInterval(CsvIntervalMsg {
                    worker_id: self.worker_id,
                    timestamp_unix_secs: unix_secs(),
                    interval_duration_secs: flushed.duration.as_secs_f64(),
                    interval_latencies_ms: flushed.latencies_ms,
                    interval_requests: flushed.counters.requests,
                    interval_errors: flushed.counters.errors,
                    interval_moved: flushed.counters.moved,
                    interval_clusterdown: flushed.counters.clusterdown,
                    interval_disconnects: flushed.counters.disconnects,
                }));
            }
        }

        let snapshot = self.counters.snapshot();
        let latencies_ms = self.full_latencies.lock().expect("latency history mutex poisoned").clone();
        sink(Message::Final(FinalMsg {
            worker_id: self.worker_id,
            latencies_ms,
            total_requests: snapshot.requests_completed,
            total_errors: snapshot.errors,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use valkey_load_client::StubClient;
    use valkey_load_core::{KeyspaceMode, RampMode};

    fn base_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 6379,
            pool_size: 2,
            num_threads: 2,
            total_requests: 20,
            data_size: 8,
            command: Command::Set,
            request_timeout_ms: None,
            use_tls: false,
            is_cluster: false,
            read_from_replica: false,
            random_keyspace: 0,
            sequential_keyspacelen: 0,
            sequential_random_start: false,
            test_duration_secs: 0,
            qps: 0,
            start_qps: 0,
            end_qps: 0,
            qps_change_interval_secs: 0,
            qps_change: 0,
            qps_ramp_mode: RampMode::Linear,
            qps_ramp_factor: None,
            csv_interval_sec: None,
            num_processes: 1,
            custom_command_file: None,
            custom_command_args: None,
        }
    }

    #[test]
    fn runs_to_quota_and_emits_final_message() {
        let config = base_config();
        let shutdown = Arc::new(AtomicBool::new(false));
        let engine = WorkerEngine::<StubClient>::new(config, 0, shutdown, None).unwrap();

        let messages: Arc<StdMutex<Vec<Message>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink_messages = messages.clone();
        let sink = move |msg: Message| sink_messages.lock().unwrap().push(msg);

        let reason = engine.run(&sink);
        assert_eq!(reason, StopReason::Quota);
        assert_eq!(engine.counters().snapshot().requests_completed, 20);

        let collected = messages.lock().unwrap();
        assert!(matches!(collected.last(), Some(Message::Final(_))));
    }

    #[test]
    fn deadline_stops_worker_when_duration_elapses() {
        let mut config = base_config();
        config.test_duration_secs = 1;
        config.total_requests = u64::MAX;
        config.num_threads = 1;
        let shutdown = Arc::new(AtomicBool::new(false));
        let engine = WorkerEngine::<StubClient>::new(config, 0, shutdown, None).unwrap();
        let reason = engine.run(&|_| {});
        assert_eq!(reason, StopReason::Deadline);
    }

    #[test]
    fn shutdown_flag_stops_worker_immediately() {
        let mut config = base_config();
        config.total_requests = u64::MAX;
        config.num_threads = 1;
        let shutdown = Arc::new(AtomicBool::new(true));
        let engine = WorkerEngine::<StubClient>::new(config, 0, shutdown, None).unwrap();
        let reason = engine.run(&|_| {});
        assert_eq!(reason, StopReason::Shutdown);
    }

    #[test]
    fn default_keyspace_mode_is_used_when_unconfigured() {
        let config = base_config();
        assert_eq!(config.keyspace_mode(), KeyspaceMode::Default);
    }
}
