use std::io::{self, Write};

use valkey_load_core::LatencySummary;

/// Prints the once-a-second, carriage-return progress line human mode uses
/// for both the single-process fast path and the orchestrator's
/// cross-worker aggregation: total completed/errors so far, plus the
/// latency stats of whatever samples landed in the window since the last
/// print.
pub fn print_progress_line(total_completed: u64, total_errors: u64, window_latencies_ms: &[f64]) {
    let summary = LatencySummary::from_latencies_ms(window_latencies_ms);
    print!(
        "\rcompleted: {total_completed:<10} errors: {total_errors:<6} p50: {:>7.3}ms  p99: {:>7.3}ms  max: {:>7.3}ms",
        summary.p50_usec as f64 / 1000.0,
        summary.p99_usec as f64 / 1000.0,
        summary.p100_usec as f64 / 1000.0,
    );
    let _ = io::stdout().flush();
}

/// Moves off the carriage-return line once the run is over so the final
/// summary doesn't overwrite the last progress update.
pub fn finish_progress_line() {
    println!();
}
