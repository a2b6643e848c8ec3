//! Error types shared by the statistics, loader and time modules.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Density was requested over a matrix with zero users or zero items.
    #[error("Division undefined: matrix of {users} users x {items} items has no cells")]
    DivisionUndefined { users: u64, items: u64 },

    #[error("Invalid timestamp: {0}")]
    Time(#[from] TimeParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Timestamp parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Timestamp cannot be empty")]
    EmptyInput,
    #[error("Unrecognized timestamp format: '{0}'")]
    InvalidFormat(String),
    #[error("Invalid month: {0} (must be 1-12)")]
    InvalidMonth(u32),
    #[error("Invalid day: {0} for the given month")]
    InvalidDay(u32),
    #[error("Invalid time of day: {0:02}:{1:02}:{2:02}")]
    InvalidTimeOfDay(u32, u32, u32),
}
