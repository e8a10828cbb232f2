use std::fmt;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors surfaced before or during a run that are not per-request failures.
///
/// Per-request failures (MOVED, CLUSTERDOWN, timeouts, disconnects) are
/// never turned into a `BenchError` — they are classified and counted
/// inline by the worker engine instead.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("custom command requires --custom-command-file")]
    MissingCustomCommandFile,

    #[error("{0}")]
    InvalidCommandType(String),

    #[error("{0}")]
    InvalidRampMode(String),

    #[error("custom command file not found: {0}")]
    CustomCommandFileNotFound(String),

    #[error("custom command '{0}' is not registered")]
    UnknownCustomCommand(String),

    #[error("--sequential-random-start requires --sequential")]
    SequentialRandomStartRequiresSequential,

    #[error("--sequential and --test-duration are mutually exclusive")]
    SequentialWithTestDuration,

    #[error("--processes must be 'auto' or a positive integer, got '{0}'")]
    InvalidProcessCount(String),

    #[error("--qps-ramp-mode exponential requires --qps-ramp-factor")]
    MissingRampFactor,

    #[error("--qps-ramp-factor must be > 0, got {0}")]
    InvalidRampFactor(f64),

    #[error("connection setup failed: {0}")]
    Connection(String),

    #[error("worker process exited abnormally: {0}")]
    WorkerFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Case-insensitive classification of a server error message into the
/// cluster-level subcategories the sample pipeline tracks in addition to
/// the general error counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Moved,
    ClusterDown,
    General,
}

impl ErrorClass {
    pub fn classify(message: &str) -> Self {
        let upper = message.to_uppercase();
        if upper.contains("MOVED") {
            ErrorClass::Moved
        } else if upper.contains("CLUSTERDOWN") {
            ErrorClass::ClusterDown
        } else {
            ErrorClass::General
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Moved => write!(f, "moved"),
            ErrorClass::ClusterDown => write!(f, "clusterdown"),
            ErrorClass::General => write!(f, "general"),
        }
    }
}
