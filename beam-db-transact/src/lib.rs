//! Transaction coordinator
//!
//! Orchestrates conditional multi-key writes over the log: snapshot the
//! inputs, propose a transaction record, poll each touched key until the
//! outcome is knowable relative to the transaction's log index, then append
//! the commit/abort decision. Resolution order is log order, so overlapping
//! transactions serialize without deadlock.

pub mod coordinator;
pub mod error;

pub use coordinator::{Coordinator, CoordinatorConfig, TxnReceipt};
pub use error::{Result, TxnError};
