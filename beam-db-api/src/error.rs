//! Error types for beam-db-api

use beam_db_log::LogError;
use beam_db_transact::TxnError;
use beam_db_view::ViewError;
use thiserror::Error;

/// Result type alias using our ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// API layer error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed client input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Deadline reached waiting on views
    #[error("Deadline exceeded: {0}")]
    Deadline(String),

    /// Coordinator error (conflict, timeout, routing)
    #[error(transparent)]
    Txn(#[from] TxnError),

    /// Log broker error
    #[error(transparent)]
    Log(#[from] LogError),

    /// View replica error
    #[error(transparent)]
    View(#[from] ViewError),

    /// Record or key codec error
    #[error(transparent)]
    Codec(#[from] beam_db_core::Error),
}

impl ApiError {
    /// Create an invalid-request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        ApiError::InvalidRequest(msg.into())
    }
}
