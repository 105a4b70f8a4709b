//! Error types for beam-db-log

use thiserror::Error;

/// Result type alias using our LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Log broker error type
#[derive(Error, Debug)]
pub enum LogError {
    /// Append or tail failure against the broker
    #[error("Log unavailable: {0}")]
    Unavailable(String),

    /// Partition id outside the broker's configured range
    #[error("Unknown partition {0}")]
    UnknownPartition(u32),
}

impl LogError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        LogError::Unavailable(msg.into())
    }
}
