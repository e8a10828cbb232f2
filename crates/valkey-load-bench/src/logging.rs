use tracing_subscriber::EnvFilter;

/// Initializes structured logging: one line per worker lifecycle event
/// (spawn, stop-condition fired, teardown) and a `warn!`/`error!` per
/// classified failure path, at the `RUST_LOG` level (`info` by default).
/// Writes to stderr so stdout stays reserved for CSV rows in CSV mode.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
