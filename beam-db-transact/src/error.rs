//! Error types for beam-db-transact

use beam_db_core::TxIndex;
use beam_db_log::LogError;
use beam_db_view::ViewError;
use thiserror::Error;

/// Result type alias using our TxnError
pub type Result<T> = std::result::Result<T, TxnError>;

/// Coordinator error type
#[derive(Error, Debug)]
pub enum TxnError {
    /// Aborted by precondition: a touched key moved past the snapshot
    #[error("transaction {tx_index} aborted: stale read on key '{key}'")]
    Conflict { key: String, tx_index: TxIndex },

    /// Deadline reached while overlapping transactions stayed undecided;
    /// an aborting decision was appended
    #[error("transaction {tx_index} timed out awaiting overlapping transactions")]
    Timeout { tx_index: TxIndex },

    /// Touched keys route to different partitions, so no single log order
    /// covers them
    #[error("keys route to different partitions: {0}")]
    CrossPartition(String),

    /// Record encoding failure
    #[error(transparent)]
    Codec(#[from] beam_db_core::Error),

    /// Log append failure
    #[error(transparent)]
    Log(#[from] LogError),

    /// View read failure
    #[error(transparent)]
    View(#[from] ViewError),
}
