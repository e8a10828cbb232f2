use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// The command a worker issues for every dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Set,
    Get,
    Custom,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "set" => Ok(Command::Set),
            "get" => Ok(Command::Get),
            "custom" => Ok(Command::Custom),
            other => Err(format!("unknown command type '{other}', expected set|get|custom")),
        }
    }
}

/// How `current_qps` advances once a ramp is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampMode {
    Linear,
    Exponential,
}

impl std::str::FromStr for RampMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "linear" => Ok(RampMode::Linear),
            "exponential" => Ok(RampMode::Exponential),
            other => Err(format!("unknown qps-ramp-mode '{other}', expected linear|exponential")),
        }
    }
}

/// Keyspace selection mode, in precedence order: sequential (with optional
/// random start) beats random beats the per-task default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyspaceMode {
    Sequential { len: u64, random_start: bool },
    Random { size: u64 },
    Default,
}

/// The full, immutable configuration for a run, built once from the CLI and
/// never mutated afterwards. Serializable so the orchestrator can hand a
/// per-worker plan to a freshly spawned child process over its stdin pipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub pool_size: usize,
    pub num_threads: usize,
    pub total_requests: u64,
    pub data_size: usize,
    pub command: Command,
    pub request_timeout_ms: Option<u64>,
    pub use_tls: bool,
    pub is_cluster: bool,
    pub read_from_replica: bool,
    pub random_keyspace: u64,
    pub sequential_keyspacelen: u64,
    pub sequential_random_start: bool,
    pub test_duration_secs: u64,
    pub qps: i64,
    pub start_qps: i64,
    pub end_qps: i64,
    pub qps_change_interval_secs: u64,
    pub qps_change: i64,
    pub qps_ramp_mode: RampMode,
    pub qps_ramp_factor: Option<f64>,
    pub csv_interval_sec: Option<u64>,
    pub num_processes: usize,
    pub custom_command_file: Option<String>,
    pub custom_command_args: Option<String>,
}

impl Config {
    /// Validates the mutual-exclusion and dependency rules between flags.
    /// Called once, before any worker is launched.
    pub fn validate(&self) -> Result<()> {
        if self.sequential_random_start && self.sequential_keyspacelen == 0 {
            return Err(BenchError::SequentialRandomStartRequiresSequential);
        }
        if self.sequential_keyspacelen > 0 && self.test_duration_secs > 0 {
            return Err(BenchError::SequentialWithTestDuration);
        }
        if self.command == Command::Custom && self.custom_command_file.is_none() {
            return Err(BenchError::MissingCustomCommandFile);
        }
        if self.qps_ramp_mode == RampMode::Exponential
            && self.start_qps > 0
            && self.end_qps > 0
            && self.qps_ramp_factor.is_none()
        {
            return Err(BenchError::MissingRampFactor);
        }
        if let Some(factor) = self.qps_ramp_factor {
            if factor <= 0.0 {
                return Err(BenchError::InvalidRampFactor(factor));
            }
        }
        Ok(())
    }

    pub fn keyspace_mode(&self) -> KeyspaceMode {
        if self.sequential_keyspacelen > 0 {
            KeyspaceMode::Sequential {
                len: self.sequential_keyspacelen,
                random_start: self.sequential_random_start,
            }
        } else if self.random_keyspace > 0 {
            KeyspaceMode::Random { size: self.random_keyspace }
        } else {
            KeyspaceMode::Default
        }
    }

    /// Splits this configuration across `num_processes` workers: request
    /// quota and the three QPS knobs are divided, connection and thread
    /// counts are per-worker capacities and pass through unchanged.
    pub fn plan_workers(&self) -> Vec<Config> {
        let n = self.num_processes.max(1) as u64;
        (0..n)
            .map(|i| {
                let extra = if i < self.total_requests % n { 1 } else { 0 };
                let mut worker = self.clone();
                worker.total_requests = self.total_requests / n + extra;
                worker.qps = self.qps / n as i64;
                worker.start_qps = self.start_qps / n as i64;
                worker.end_qps = self.end_qps / n as i64;
                worker.num_processes = 1;
                worker
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 6379,
            pool_size: 50,
            num_threads: 1,
            total_requests: 100_000,
            data_size: 3,
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
    fn splits_remainder_across_leading_workers() {
        let mut cfg = base();
        cfg.total_requests = 10;
        cfg.num_processes = 4;
        cfg.qps = 100;
        let plans = cfg.plan_workers();
        let totals: Vec<u64> = plans.iter().map(|p| p.total_requests).collect();
        assert_eq!(totals, vec![3, 3, 2, 2]);
        assert_eq!(totals.iter().sum::<u64>(), 10);
        assert!(plans.iter().all(|p| p.qps == 25));
    }

    #[test]
    fn sequential_random_start_requires_sequential() {
        let mut cfg = base();
        cfg.sequential_random_start = true;
        assert!(matches!(
            cfg.validate(),
            Err(BenchError::SequentialRandomStartRequiresSequential)
        ));
    }

    #[test]
    fn sequential_and_duration_are_exclusive() {
        let mut cfg = base();
        cfg.sequential_keyspacelen = 1000;
        cfg.test_duration_secs = 30;
        assert!(matches!(cfg.validate(), Err(BenchError::SequentialWithTestDuration)));
    }

    #[test]
    fn custom_command_requires_file() {
        let mut cfg = base();
        cfg.command = Command::Custom;
        assert!(matches!(cfg.validate(), Err(BenchError::MissingCustomCommandFile)));
    }

    #[test]
    fn keyspace_precedence_sequential_over_random() {
        let mut cfg = base();
        cfg.sequential_keyspacelen = 100;
        cfg.random_keyspace = 50;
        assert_eq!(
            cfg.keyspace_mode(),
            KeyspaceMode::Sequential { len: 100, random_start: false }
        );
    }
}
