//! Two runnable custom-command programs ported from
//! `original_source/python/{set_benchmark,hset_benchmark_large}.py`: each
//! implements the same warmup/benchmark split over the `CustomCommand`
//! seam (§6.4), driven by the same four environment variables (§6.5) the
//! Python originals read directly.

pub mod hset_benchmark_large;
pub mod set_benchmark;

use valkey_load_worker::CustomCommandRegistry;

/// Registers both demo programs under the names their `--custom-command-file`
/// path's file stem would resolve to.
pub fn register_demo_commands(registry: &mut CustomCommandRegistry) {
    registry.register("set_benchmark", |_args| Box::new(set_benchmark::SetBenchmark::new()));
    registry.register("hset_benchmark_large", |_args| {
        Box::new(hset_benchmark_large::HsetBenchmarkLarge::new())
    });
}
