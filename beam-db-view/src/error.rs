//! Error types for beam-db-view

use thiserror::Error;

/// Result type alias using our ViewError
pub type Result<T> = std::result::Result<T, ViewError>;

/// View replica error type
#[derive(Error, Debug)]
pub enum ViewError {
    /// The partition's consumer has halted or the view is gone
    #[error("View unavailable: {0}")]
    Unavailable(String),
}

impl ViewError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        ViewError::Unavailable(msg.into())
    }
}
