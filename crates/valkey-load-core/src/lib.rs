//! Shared types for the valkey-load workspace: the immutable run
//! configuration, the error taxonomy, and the percentile math the sample
//! pipeline and the CSV/summary renderers both depend on.

mod config;
mod error;
mod percentile;

pub use config::{Command, Config, KeyspaceMode, RampMode};
pub use error::{BenchError, ErrorClass, Result};
pub use percentile::{percentile_usec, truncate_to_usec, LatencySummary};
