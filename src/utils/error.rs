//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur during trace ingestion
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Trace length of {0} bytes is not a multiple of 8")]
    TruncatedStream(usize),

    #[error("Subtrace delimiter at word {0} with no open invocation")]
    SubTraceOutsideInvocation(usize),

    #[error("Subtrace closed at word {0} but none was open")]
    UnmatchedSubTraceClose(usize),

    #[error("Page address at word {0} with no open subtrace")]
    PageOutsideSubTrace(usize),
}

/// Errors that can occur while loading performance counters
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to read performance CSV: {0}")]
    ReadFailed(#[from] csv::Error),

    #[error("Missing column {0:?} in performance CSV header")]
    MissingColumn(&'static str),

    #[error("Row {row}: invalid value {value:?} for column {column:?}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Errors that can occur during distance computation and clustering
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Cannot cluster an empty input")]
    EmptyInput,

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    #[error("Minimum observed {metric} is zero; cannot weight clusters")]
    ZeroMetricFloor { metric: &'static str },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("Invocation set {set} is present in clusters {first} and {second}")]
    OverlappingClusters {
        set: usize,
        first: usize,
        second: usize,
    },

    #[error("Invocation set {0} is neither clustered nor noise")]
    UnassignedSet(usize),

    #[error("Invocation set {0} is listed as noise more than once or is also clustered")]
    DuplicateNoiseSet(usize),

    #[error("Cluster {0} has no members")]
    EmptyCluster(usize),

    #[error("Cluster member references invocation set {0} which does not exist")]
    UnknownSet(usize),
}

/// Errors that can occur while reading or writing clustering results
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Invalid clustering result: {0}")]
    InvalidResult(#[from] ClusterError),
}
