//! Error types for the value-learning engine

use thiserror::Error;

/// Every failure the engine reports. All of them are scoped to the call that
/// raised them: the table, the network and the replay buffer are left exactly
/// as they were before the call.
#[derive(Error, Debug)]
pub enum LearnError {
    /// Constructor arguments disagree with each other (array lengths, layer count, empty spaces)
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    /// An input vector or state tuple has the wrong width
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    Dimension {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A categorical index lies outside its declared cardinality
    #[error("Index {index} out of range for {what} (bound {bound})")]
    Range {
        what: String,
        index: usize,
        bound: usize,
    },

    /// Persisted data is malformed or has the wrong length
    #[error("Format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Statistics export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LearnError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        LearnError::Format { line, reason: reason.into() }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, LearnError>;
