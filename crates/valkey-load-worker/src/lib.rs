pub mod counters;
pub mod custom_command;
pub mod engine;

pub use counters::{CountersSnapshot, SharedCounters};
pub use custom_command::{load_custom_command, CustomCommand, CustomCommandRegistry};
pub use engine::{StopReason, WorkerEngine};
