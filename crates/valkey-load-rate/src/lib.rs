//! Per-worker QPS ceiling and ramp.
//!
//! `RateController` state is per-worker, never shared across the tasks
//! inside a worker: each worker owns exactly one instance.

use std::time::{Duration, Instant};

use valkey_load_core::{Config, RampMode};

/// Abstracts wall-clock access so the ramp/ceiling arithmetic can be
/// exercised in tests without sleeping for real.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, dur: Duration);
}

/// The real clock used in production: sleeps the calling thread.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    mode: RampMode,
    qps_change: i64,
    ramp_factor: f64,
    end_qps: i64,
    interval: Duration,
    /// Sign of `end_qps - effective_start_qps`: +1 up, -1 down, 0 flat.
    direction: i64,
}

/// Enforces an instantaneous QPS ceiling and, optionally, ramps the
/// ceiling linearly or exponentially toward `end_qps` over time.
pub struct RateController<C: Clock = SystemClock> {
    current_qps: i64,
    second_start: Instant,
    requests_this_second: u64,
    last_update: Instant,
    ramp: Option<Ramp>,
    clock: C,
}

impl RateController<SystemClock> {
    pub fn new(cfg: &Config) -> Self {
        Self::with_clock(cfg, SystemClock)
    }
}

impl<C: Clock> RateController<C> {
    pub fn with_clock(cfg: &Config, clock: C) -> Self {
        let now = clock.now();

        let effective_start = if cfg.start_qps > 0 { cfg.start_qps } else { cfg.end_qps };

        let current_qps = if cfg.start_qps > 0 {
            cfg.start_qps
        } else if cfg.qps > 0 {
            cfg.qps
        } else if cfg.end_qps > 0 {
            tracing::warn!(
                end_qps = cfg.end_qps,
                "no --qps or --start-qps given, falling back to --end-qps as the initial ceiling"
            );
            cfg.end_qps
        } else {
            0
        };

        let ramp = if cfg.qps_change_interval_secs > 0 && cfg.end_qps > 0 {
            let direction = (cfg.end_qps - effective_start).signum();
            match cfg.qps_ramp_mode {
                RampMode::Linear => {
                    if direction != 0 && cfg.qps_change.signum() != direction {
                        tracing::warn!(
                            "qps-change sign does not match the start/end-qps direction; ramp disabled"
                        );
                        None
                    } else {
                        Some(Ramp {
                            mode: RampMode::Linear,
                            qps_change: cfg.qps_change,
                            ramp_factor: 1.0,
                            end_qps: cfg.end_qps,
                            interval: Duration::from_secs(cfg.qps_change_interval_secs),
                            direction,
                        })
                    }
                }
                RampMode::Exponential => cfg.qps_ramp_factor.map(|factor| {
                    if factor < 1.0 {
                        tracing::warn!(factor, "exponential ramp factor < 1.0, this is a ramp-down");
                    }
                    Ramp {
                        mode: RampMode::Exponential,
                        qps_change: 0,
                        ramp_factor: factor,
                        end_qps: cfg.end_qps,
                        interval: Duration::from_secs(cfg.qps_change_interval_secs),
                        direction,
                    }
                }),
            }
        } else {
            None
        };

        Self {
            current_qps,
            second_start: now,
            requests_this_second: 0,
            last_update: now,
            ramp,
            clock,
        }
    }

    /// The current QPS ceiling, after any ramp updates applied so far.
    /// Exposed for tests and for progress reporting.
    pub fn current_qps(&self) -> i64 {
        self.current_qps
    }

    fn apply_ramp(&mut self, now: Instant) {
        let Some(ramp) = self.ramp else { return };
        if now.duration_since(self.last_update) < ramp.interval {
            return;
        }

        match ramp.mode {
            RampMode::Linear => {
                self.current_qps += ramp.qps_change;
                if (ramp.qps_change > 0 && self.current_qps > ramp.end_qps)
                    || (ramp.qps_change < 0 && self.current_qps < ramp.end_qps)
                {
                    self.current_qps = ramp.end_qps;
                }
            }
            RampMode::Exponential => {
                self.current_qps = (self.current_qps as f64 * ramp.ramp_factor).round() as i64;
                if ramp.direction > 0 && self.current_qps > ramp.end_qps {
                    self.current_qps = ramp.end_qps;
                } else if ramp.direction < 0 && self.current_qps < ramp.end_qps {
                    self.current_qps = ramp.end_qps;
                }
            }
        }
        self.last_update = now;
    }

    /// Suspends the caller long enough that this worker's QPS does not
    /// exceed `current_qps`. Returns immediately in unlimited mode.
    pub fn throttle(&mut self) {
        if self.current_qps <= 0 {
            return;
        }

        let now = self.clock.now();
        self.apply_ramp(now);

        if now.duration_since(self.second_start) >= Duration::from_secs(1) {
            self.requests_this_second = 0;
            self.second_start = now;
        }

        if self.requests_this_second >= self.current_qps as u64 {
            let elapsed = now.duration_since(self.second_start).as_secs_f64();
            let wait = 1.0 - elapsed;
            if wait > 0.0 {
                self.clock.sleep(Duration::from_secs_f64(wait));
            }
            self.requests_this_second = 0;
            self.second_start = self.clock.now();
        }

        self.requests_this_second += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Advances a synthetic clock whenever `throttle` asks it to sleep, so
    /// ramp/ceiling tests run instantly and deterministically. Tests that
    /// need to simulate the passage of time *between* dispatch calls (not
    /// just the sleeps `throttle` itself requests) advance it directly.
    struct FakeClock {
        now: Cell<Instant>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self { now: Cell::new(Instant::now()) }
        }

        fn advance(&self, dur: Duration) {
            self.now.set(self.now.get() + dur);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&mut self, dur: Duration) {
            self.advance(dur);
        }
    }

    fn base_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 6379,
            pool_size: 1,
            num_threads: 1,
            total_requests: 0,
            data_size: 3,
            command: valkey_load_core::Command::Set,
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
            qps_ramp_mode: valkey_load_core::RampMode::Linear,
            qps_ramp_factor: None,
            csv_interval_sec: None,
            num_processes: 1,
            custom_command_file: None,
            custom_command_args: None,
        }
    }

    #[test]
    fn unlimited_mode_never_sleeps() {
        let cfg = base_config();
        let mut rc = RateController::with_clock(&cfg, FakeClock::new());
        for _ in 0..1000 {
            rc.throttle();
        }
        assert_eq!(rc.current_qps(), 0);
    }

    #[test]
    fn initial_qps_prefers_start_over_qps_over_end() {
        let mut cfg = base_config();
        cfg.qps = 50;
        cfg.end_qps = 200;
        assert_eq!(RateController::with_clock(&cfg, FakeClock::new()).current_qps(), 50);

        cfg.start_qps = 10;
        assert_eq!(RateController::with_clock(&cfg, FakeClock::new()).current_qps(), 10);
    }

    #[test]
    fn falls_back_to_end_qps_when_nothing_else_set() {
        let mut cfg = base_config();
        cfg.end_qps = 300;
        assert_eq!(RateController::with_clock(&cfg, FakeClock::new()).current_qps(), 300);
    }

    #[test]
    fn linear_ramp_saturates_at_end_qps() {
        let mut cfg = base_config();
        cfg.start_qps = 100;
        cfg.end_qps = 500;
        cfg.qps_change = 100;
        cfg.qps_change_interval_secs = 1;
        let mut rc = RateController::with_clock(&cfg, FakeClock::new());

        let mut seen = vec![rc.current_qps()];
        for _ in 0..6 {
            rc.clock.advance(Duration::from_secs(1));
            rc.apply_ramp(rc.clock.now());
            seen.push(rc.current_qps());
        }
        assert_eq!(seen, vec![100, 200, 300, 400, 500, 500, 500]);
        for w in seen.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn exponential_ramp_sequence() {
        let mut cfg = base_config();
        cfg.start_qps = 100;
        cfg.end_qps = 1600;
        cfg.qps_ramp_mode = valkey_load_core::RampMode::Exponential;
        cfg.qps_ramp_factor = Some(2.0);
        cfg.qps_change_interval_secs = 1;

        let mut rc = RateController::with_clock(&cfg, FakeClock::new());
        assert_eq!(rc.current_qps(), 100);

        let expected = [200, 400, 800, 1600, 1600];
        for exp in expected {
            rc.clock.advance(Duration::from_secs(1));
            rc.apply_ramp(rc.clock.now());
            assert_eq!(rc.current_qps(), exp);
        }
    }

    #[test]
    fn linear_ramp_disabled_when_change_sign_mismatches_direction() {
        let mut cfg = base_config();
        cfg.start_qps = 500;
        cfg.end_qps = 100;
        cfg.qps_change = 100; // wrong sign: should be negative to ramp down
        cfg.qps_change_interval_secs = 1;
        let mut rc = RateController::with_clock(&cfg, FakeClock::new());
        let before = rc.current_qps();
        rc.clock.advance(Duration::from_secs(2));
        rc.apply_ramp(rc.clock.now());
        assert_eq!(rc.current_qps(), before);
    }

    #[test]
    fn ceiling_enforces_one_second_budget() {
        let mut cfg = base_config();
        cfg.qps = 3;
        let mut rc = RateController::with_clock(&cfg, FakeClock::new());
        // First 3 calls consume the budget without sleeping (FakeClock
        // starts static, so no time passes between them).
        rc.throttle();
        rc.throttle();
        rc.throttle();
        let before = rc.clock.now();
        rc.throttle(); // 4th call exceeds the budget and must sleep ~1s
        let after = rc.clock.now();
        assert!(after.duration_since(before) >= Duration::from_millis(900));
    }
}
