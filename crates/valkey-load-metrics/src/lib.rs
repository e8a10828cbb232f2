pub mod aggregate;
pub mod bucket;
pub mod channel;
pub mod csv;
pub mod message;
pub mod summary;

pub use aggregate::AggregatedInterval;
pub use bucket::{Counters, FlushedInterval, IntervalBucket};
pub use channel::MetricsChannel;
pub use csv::IntervalReport;
pub use message::{CsvIntervalMsg, FinalMsg, Message, WorkerProgress};
pub use summary::RunSummary;
