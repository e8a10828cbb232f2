//! `valkey-load-bench`: a load generator for Valkey/Redis-compatible
//! servers. Drives SET, GET, or a custom command program at a controlled
//! rate across many connections and processes, and reports latency
//! percentiles, throughput, and error taxonomies in human or CSV form.
//!
//! This binary wears two hats, distinguished by `WORKER_ENV_VAR` in the
//! process environment:
//! - Absent: this is the orchestrator (or, with `--single-process`/one CPU,
//!   the only worker too) — parse the CLI, build a `Config`, and either run
//!   the benchmark directly or spawn and multiplex worker subprocesses.
//! - Present: this is a worker subprocess re-exec'd by the orchestrator,
//!   with its plan waiting on stdin.

mod cli;
mod custom;
mod logging;
mod orchestrator;
mod report;
mod single;
mod worker_entry;

use std::process::ExitCode;

use clap::Parser;

/// Set by the orchestrator on every worker subprocess it spawns; its mere
/// presence (value is unused) routes `main` into `worker_entry::run`
/// instead of CLI parsing.
pub(crate) const WORKER_ENV_VAR: &str = "VALKEY_LOAD_WORKER";

fn main() -> ExitCode {
    logging::init();

    if std::env::var_os(WORKER_ENV_VAR).is_some() {
        return ExitCode::from(worker_entry::run() as u8);
    }

    let cli = cli::CliArgs::parse();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    let exit_code = if config.num_processes <= 1 {
        let custom_command = match custom::build_custom_command(&config) {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
        };
        single::run(config, custom_command)
    } else {
        orchestrator::run(config)
    };

    ExitCode::from(exit_code as u8)
}
