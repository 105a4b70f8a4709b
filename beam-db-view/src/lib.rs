//! View replica
//!
//! Each log partition owns one view: a consumer task tails the partition and
//! folds records into a multi-version map, and readers get point lookups,
//! range scans, and conditional-commit checks against committed state at a
//! chosen log index.
//!
//! The record observed at offset `O` is addressed as transaction index
//! `O + 1`; that index is the MVCC version of everything the record wrote.
//! Readers never observe pending (proposed but undecided) writes.

pub mod consumer;
pub mod error;
pub mod state;
pub mod stats;
pub mod view;

pub use consumer::ViewConsumer;
pub use error::{Result, ViewError};
pub use state::{CheckResult, TxStatus, VersionedValue};
pub use stats::ViewStats;
pub use view::{FactView, ScanEntry, View};
