use std::str::FromStr;

use clap::Parser;
use valkey_load_core::{BenchError, Command, Config, RampMode, Result};

/// A load generator for Valkey/Redis-compatible servers: drives SET, GET, or
/// a user-supplied command program at a controlled rate across many
/// connections and processes, and reports latency percentiles, throughput,
/// and error taxonomies.
#[derive(Debug, Parser)]
#[command(name = "valkey-load-bench", version, about)]
pub struct CliArgs {
    /// Server hostname.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 6379)]
    pub port: u16,

    /// Connections per worker process (the pool each worker's dispatch
    /// threads share).
    #[arg(short, long, default_value_t = 50)]
    pub clients: usize,

    /// Total requests across all worker processes. Treated as an upper
    /// bound only when --test-duration is also set; otherwise it is the
    /// stop condition.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub requests: u64,

    /// SET payload size in bytes.
    #[arg(short, long, default_value_t = 3)]
    pub datasize: usize,

    /// Command to issue for each dispatched request: set, get, or custom.
    #[arg(short = 't', long, default_value = "set")]
    pub r#type: String,

    /// Random keyspace size; 0 disables random key selection.
    #[arg(short, long, default_value_t = 0)]
    pub random: u64,

    /// Cooperative dispatch tasks (threads, in this port) per worker
    /// process.
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Wall-clock run length in seconds. 0 or unset disables the deadline
    /// and falls back to --requests as the stop condition.
    #[arg(long, default_value_t = 0)]
    pub test_duration: u64,

    /// Sequential keyspace length; 0 disables sequential key selection.
    #[arg(long, default_value_t = 0)]
    pub sequential: u64,

    /// Start each task's sequential walk at a random offset into the
    /// keyspace instead of 0. Requires --sequential.
    #[arg(long, default_value_t = false)]
    pub sequential_random_start: bool,

    /// Fixed QPS ceiling, used as the initial ceiling when no ramp is
    /// configured (or no --start-qps is given).
    #[arg(long, default_value_t = 0)]
    pub qps: i64,

    /// Initial QPS ceiling when a ramp is configured.
    #[arg(long, default_value_t = 0)]
    pub start_qps: i64,

    /// QPS ceiling the ramp approaches and saturates at.
    #[arg(long, default_value_t = 0)]
    pub end_qps: i64,

    /// How often (seconds) the ramp updates current_qps.
    #[arg(long, default_value_t = 0)]
    pub qps_change_interval: u64,

    /// Per-interval additive change in linear ramp mode.
    #[arg(long, default_value_t = 0)]
    pub qps_change: i64,

    /// Ramp shape: linear (additive) or exponential (multiplicative).
    #[arg(long, default_value = "linear")]
    pub qps_ramp_mode: String,

    /// Multiplicative per-interval factor in exponential ramp mode.
    /// Required when --qps-ramp-mode=exponential.
    #[arg(long)]
    pub qps_ramp_factor: Option<f64>,

    /// Connect over TLS.
    #[arg(long, default_value_t = false)]
    pub tls: bool,

    /// Treat the server as a cluster (MOVED/CLUSTERDOWN-aware routing).
    #[arg(long, default_value_t = false)]
    pub cluster: bool,

    /// Steer reads to replicas instead of the primary.
    #[arg(long, default_value_t = false)]
    pub read_from_replica: bool,

    /// Path to a registered custom command program. Required when
    /// --type=custom.
    #[arg(long)]
    pub custom_command_file: Option<String>,

    /// Opaque argument string forwarded to the custom command's
    /// constructor; parsing it is the plug-in's concern.
    #[arg(long)]
    pub custom_command_args: Option<String>,

    /// Enables CSV output mode and sets the interval length, in seconds,
    /// between emitted rows. Unset keeps human-readable progress mode.
    #[arg(long)]
    pub interval_metrics_interval_duration_sec: Option<u64>,

    /// Number of worker processes, or "auto" to use the CPU count.
    #[arg(long, default_value = "auto")]
    pub processes: String,

    /// Forces a single worker process regardless of --processes.
    #[arg(long, default_value_t = false)]
    pub single_process: bool,

    /// Per-request client timeout, in milliseconds.
    #[arg(long)]
    pub request_timeout: Option<u64>,
}

impl CliArgs {
    /// Resolves "auto"/a positive integer into a worker-process count.
    fn resolve_processes(&self) -> Result<usize> {
        if self.single_process {
            return Ok(1);
        }
        if self.processes == "auto" {
            return Ok(num_cpus::get().max(1));
        }
        match self.processes.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(BenchError::InvalidProcessCount(self.processes.clone())),
        }
    }

    /// Builds and validates the immutable run `Config` from the parsed
    /// arguments. Returns the same validation errors spec.md's CLI table
    /// calls for, all before any worker is launched.
    pub fn into_config(self) -> Result<Config> {
        let command = Command::from_str(&self.r#type).map_err(BenchError::InvalidCommandType)?;
        let qps_ramp_mode =
            RampMode::from_str(&self.qps_ramp_mode).map_err(BenchError::InvalidRampMode)?;
        let num_processes = self.resolve_processes()?;

        let config = Config {
            host: self.host,
            port: self.port,
            pool_size: self.clients,
            num_threads: self.threads,
            total_requests: self.requests,
            data_size: self.datasize,
            command,
            request_timeout_ms: self.request_timeout,
            use_tls: self.tls,
            is_cluster: self.cluster,
            read_from_replica: self.read_from_replica,
            random_keyspace: self.random,
            sequential_keyspacelen: self.sequential,
            sequential_random_start: self.sequential_random_start,
            test_duration_secs: self.test_duration,
            qps: self.qps,
            start_qps: self.start_qps,
            end_qps: self.end_qps,
            qps_change_interval_secs: self.qps_change_interval,
            qps_change: self.qps_change,
            qps_ramp_mode,
            qps_ramp_factor: self.qps_ramp_factor,
            csv_interval_sec: self.interval_metrics_interval_duration_sec,
            num_processes,
            custom_command_file: self.custom_command_file,
            custom_command_args: self.custom_command_args,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut full = vec!["valkey-load-bench"];
        full.extend_from_slice(args);
        CliArgs::parse_from(full)
    }

    #[test]
    fn defaults_match_spec_table() {
        let cfg = parse(&[]).into_config().unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 6379);
        assert_eq!(cfg.pool_size, 50);
        assert_eq!(cfg.total_requests, 100_000);
        assert_eq!(cfg.data_size, 3);
        assert_eq!(cfg.command, Command::Set);
        assert_eq!(cfg.num_threads, 1);
    }

    #[test]
    fn single_process_flag_overrides_processes() {
        let cfg = parse(&["--processes", "8", "--single-process"]).into_config().unwrap();
        assert_eq!(cfg.num_processes, 1);
    }

    #[test]
    fn processes_auto_resolves_to_cpu_count() {
        let cfg = parse(&[]).into_config().unwrap();
        assert_eq!(cfg.num_processes, num_cpus::get().max(1));
    }

    #[test]
    fn invalid_processes_value_is_rejected() {
        let err = parse(&["--processes", "nope"]).into_config().unwrap_err();
        assert!(matches!(err, BenchError::InvalidProcessCount(_)));
    }

    #[test]
    fn custom_type_without_file_is_rejected() {
        let err = parse(&["--type", "custom"]).into_config().unwrap_err();
        assert!(matches!(err, BenchError::MissingCustomCommandFile));
    }

    #[test]
    fn exponential_ramp_without_factor_is_rejected() {
        let err = parse(&[
            "--qps-ramp-mode",
            "exponential",
            "--start-qps",
            "100",
            "--end-qps",
            "200",
        ])
        .into_config()
        .unwrap_err();
        assert!(matches!(err, BenchError::MissingRampFactor));
    }
}
