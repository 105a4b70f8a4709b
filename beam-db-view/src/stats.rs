//! View statistics

use serde::{Deserialize, Serialize};

/// Snapshot of one partition view's counters.
///
/// Also the value served for the reserved `beamstats` key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    /// Partition this view consumes
    pub partition: u32,
    /// Transaction index of the last applied record (0 = nothing applied)
    pub last_applied_index: u64,
    /// Offset the materialization resumes from after a wipe
    pub resume_offset: u64,
    /// Distinct keys with at least one committed version
    pub key_count: u64,
    /// Distinct SPO fact keys (each fact inserts one SPO and one POS key)
    pub fact_count: u64,
    /// Total committed versions across all keys
    pub committed_version_count: u64,
    /// Transactions proposed but not yet decided
    pub pending_tx_count: u64,
    /// Transactions with an applied decision
    pub resolved_tx_count: u64,
    /// Records skipped because they failed to decode
    pub malformed_record_count: u64,
    /// Decisions naming an unknown or already-resolved transaction
    pub unknown_decision_count: u64,
    /// Out-of-protocol situations tolerated (counted, not surfaced)
    pub anomaly_count: u64,
}
