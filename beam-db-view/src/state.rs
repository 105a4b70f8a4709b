//! The materialized state machine
//!
//! Pure fold of log records into a multi-version map plus a pending
//! transaction table. All mutation happens through [`ViewState::apply`],
//! driven in offset order by the consumer task; everything else is a read.
//!
//! ## Apply rules
//!
//! - `Write{K, V}` at offset O commits version `{index: O+1, V}` on K.
//! - `Transaction` at offset O (tx = O+1) evaluates its conditions against
//!   committed history. A condition on K is only decidable once no earlier
//!   proposed write on K remains undecided; until then the transaction is
//!   undetermined. Proposed writes mark their target keys pending.
//! - `Decision{T, commit}` promotes T's pending writes to committed versions
//!   at index T (or drops them), then re-evaluates undetermined transactions.
//!
//! Replaying the same records yields identical state; decisions for unknown
//! or already-resolved transactions are counted and ignored.

use crate::stats::ViewStats;
use beam_db_core::keys;
use beam_db_core::record::{Condition, LogRecord, TransactionRecord, WriteRecord};
use beam_db_core::TxIndex;
use beam_db_log::{Offset, Partition};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::ops::Bound;

/// A committed value with its MVCC version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub index: TxIndex,
}

/// Answer to a conditional-commit check
///
/// `ok` is meaningful only when `pending` is false; callers poll until the
/// answer is knowable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub ok: bool,
    pub pending: bool,
}

/// Lifecycle of a proposed transaction as seen by the view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Blocked on an earlier undecided transaction over a condition key
    Undetermined,
    /// Conditions known to hold; awaiting the decision record
    Satisfied,
    /// Conditions known to fail; the decision can only abort
    FailedPrecondition,
    /// Decision applied, writes committed
    Committed,
    /// Decision applied, writes dropped
    Aborted,
}

impl TxStatus {
    fn is_resolved(self) -> bool {
        matches!(self, TxStatus::Committed | TxStatus::Aborted)
    }
}

#[derive(Clone, Debug)]
struct PendingTx {
    conditions: Vec<Condition>,
    writes: Vec<WriteRecord>,
    status: TxStatus,
}

#[derive(Default)]
struct KeyVersions {
    /// Committed versions, strictly increasing by index
    committed: Vec<VersionedValue>,
    /// Transaction indexes with an undecided proposed write on this key
    pending: BTreeSet<TxIndex>,
}

/// Value served for the reserved `beammeta` key
#[derive(Serialize)]
struct MetaInfo {
    partition: Partition,
    last_applied_index: TxIndex,
    resume_offset: Offset,
}

/// Materialized state of one partition
pub struct ViewState {
    partition: Partition,
    keys: BTreeMap<Vec<u8>, KeyVersions>,
    transactions: BTreeMap<TxIndex, PendingTx>,
    last_applied: TxIndex,
    resume_from: Offset,
    key_count: u64,
    fact_count: u64,
    committed_versions: u64,
    pending_txs: u64,
    resolved_txs: u64,
    malformed_records: u64,
    unknown_decisions: u64,
    anomalies: u64,
}

impl ViewState {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            keys: BTreeMap::new(),
            transactions: BTreeMap::new(),
            last_applied: 0,
            resume_from: 0,
            key_count: 0,
            fact_count: 0,
            committed_versions: 0,
            pending_txs: 0,
            resolved_txs: 0,
            malformed_records: 0,
            unknown_decisions: 0,
            anomalies: 0,
        }
    }

    /// Transaction index of the last applied record
    pub fn last_applied(&self) -> TxIndex {
        self.last_applied
    }

    /// Fold one record into the state.
    pub fn apply(&mut self, offset: Offset, record: &LogRecord) {
        if offset < self.resume_from {
            // Materialization was rewound past this record.
            return;
        }
        let tx = offset + 1;
        match record {
            LogRecord::Write(w) => self.apply_write(tx, w),
            LogRecord::Transaction(t) => self.apply_transaction(tx, t),
            LogRecord::Decision(d) => self.apply_decision(d.tx_index, d.commit),
        }
        self.last_applied = tx;
    }

    /// Count a record that failed to decode; the offset is still consumed.
    pub fn record_malformed(&mut self, offset: Offset) {
        self.malformed_records += 1;
        if offset >= self.resume_from {
            self.last_applied = offset + 1;
        }
    }

    fn apply_write(&mut self, tx: TxIndex, w: &WriteRecord) {
        if keys::is_reserved(&w.key) {
            // Reserved keys are not client-writable.
            self.anomalies += 1;
            return;
        }
        self.push_committed(&w.key, tx, w.value.clone());
    }

    fn apply_transaction(&mut self, tx: TxIndex, t: &TransactionRecord) {
        let status = self.evaluate(tx, &t.conditions);
        if status != TxStatus::FailedPrecondition {
            for w in &t.writes {
                self.entry(&w.key).pending.insert(tx);
            }
        }
        self.pending_txs += 1;
        self.transactions.insert(
            tx,
            PendingTx {
                conditions: t.conditions.clone(),
                writes: t.writes.clone(),
                status,
            },
        );
    }

    fn apply_decision(&mut self, tx: TxIndex, commit: bool) {
        let (status, writes) = match self.transactions.get(&tx) {
            None => {
                self.unknown_decisions += 1;
                return;
            }
            Some(ptx) if ptx.status.is_resolved() => {
                self.unknown_decisions += 1;
                return;
            }
            Some(ptx) => (ptx.status, ptx.writes.clone()),
        };

        let commit_now = match status {
            TxStatus::Satisfied => commit,
            TxStatus::FailedPrecondition => false,
            TxStatus::Undetermined => {
                // A decision landed while the outcome was still blocked on an
                // earlier transaction. Treat the conditions as not holding.
                if commit {
                    self.anomalies += 1;
                }
                false
            }
            TxStatus::Committed | TxStatus::Aborted => unreachable!("checked above"),
        };
        for w in &writes {
            if let Some(kv) = self.keys.get_mut(&w.key) {
                kv.pending.remove(&tx);
            }
            if commit_now {
                if keys::is_reserved(&w.key) {
                    self.anomalies += 1;
                    continue;
                }
                self.push_committed(&w.key, tx, w.value.clone());
            }
        }

        let ptx = self.transactions.get_mut(&tx).expect("present above");
        ptx.status = if commit_now {
            TxStatus::Committed
        } else {
            TxStatus::Aborted
        };
        self.pending_txs -= 1;
        self.resolved_txs += 1;

        self.reevaluate_undetermined();
    }

    /// Re-evaluate undetermined transactions in log order; a resolution may
    /// have made their conditions decidable.
    fn reevaluate_undetermined(&mut self) {
        let undetermined: Vec<TxIndex> = self
            .transactions
            .iter()
            .filter(|(_, ptx)| ptx.status == TxStatus::Undetermined)
            .map(|(tx, _)| *tx)
            .collect();
        for tx in undetermined {
            let conditions = self.transactions[&tx].conditions.clone();
            let status = self.evaluate(tx, &conditions);
            if status != TxStatus::Undetermined {
                tracing::debug!(tx, ?status, "transaction outcome became decidable");
                self.transactions.get_mut(&tx).expect("present").status = status;
            }
        }
    }

    /// Evaluate conditions for a transaction at `tx` against current state.
    fn evaluate(&self, tx: TxIndex, conditions: &[Condition]) -> TxStatus {
        if conditions
            .iter()
            .any(|c| self.has_pending_below(&c.key, tx))
        {
            return TxStatus::Undetermined;
        }
        let holds = conditions
            .iter()
            .all(|c| self.last_committed_below(&c.key, tx) == c.index);
        if holds {
            TxStatus::Satisfied
        } else {
            TxStatus::FailedPrecondition
        }
    }

    fn entry(&mut self, key: &[u8]) -> &mut KeyVersions {
        self.keys.entry(key.to_vec()).or_default()
    }

    fn push_committed(&mut self, key: &[u8], index: TxIndex, value: Vec<u8>) {
        let is_new_key = !self.keys.contains_key(key);
        let kv = self.entry(key);
        // Usually an append, but a transaction that was proposed before a
        // plain write on the same key commits at the lower index.
        match kv.committed.binary_search_by(|v| v.index.cmp(&index)) {
            Ok(at) => kv.committed[at].value = value,
            Err(at) => {
                kv.committed.insert(at, VersionedValue { value, index });
                self.committed_versions += 1;
            }
        }
        if is_new_key {
            self.key_count += 1;
            if key.starts_with(keys::SPO_KEY_PREFIX) {
                self.fact_count += 1;
            }
        }
    }

    /// Greatest committed index of `key` strictly below `below`, 0 if none.
    fn last_committed_below(&self, key: &[u8], below: TxIndex) -> TxIndex {
        self.version_below(key, below).map_or(0, |v| v.index)
    }

    fn version_below(&self, key: &[u8], below: TxIndex) -> Option<&VersionedValue> {
        let kv = self.keys.get(key)?;
        kv.committed.iter().rev().find(|v| v.index < below)
    }

    /// Whether any undecided proposed write on `key` has index below `below`.
    fn has_pending_below(&self, key: &[u8], below: TxIndex) -> bool {
        self.keys.get(key).is_some_and(|kv| {
            kv.pending
                .range((Bound::Unbounded, Bound::Excluded(below)))
                .next()
                .is_some()
        })
    }

    /// Latest committed value of `key`, or None if absent.
    ///
    /// Never returns a pending version. The reserved keys serve the view's
    /// own metadata and statistics.
    pub fn fetch(&self, key: &[u8]) -> Option<VersionedValue> {
        if keys::is_reserved(key) {
            return self.fetch_reserved(key);
        }
        self.keys
            .get(key)
            .and_then(|kv| kv.committed.last())
            .cloned()
    }

    /// Version of `key` with the greatest committed index `<= at`.
    pub fn fetch_at(&self, key: &[u8], at: TxIndex) -> Option<VersionedValue> {
        if keys::is_reserved(key) {
            return self.fetch_reserved(key);
        }
        if at == TxIndex::MAX {
            return self.fetch(key);
        }
        self.version_below(key, at + 1).cloned()
    }

    fn fetch_reserved(&self, key: &[u8]) -> Option<VersionedValue> {
        if self.last_applied == 0 {
            return None;
        }
        let value = if key == keys::meta_key_bytes() {
            serde_json::to_vec(&MetaInfo {
                partition: self.partition,
                last_applied_index: self.last_applied,
                resume_offset: self.resume_from,
            })
        } else {
            serde_json::to_vec(&self.stats())
        };
        let value = value.expect("reserved values serialize");
        Some(VersionedValue {
            value,
            index: self.last_applied,
        })
    }

    /// Is it safe to commit a transaction at `tx_index` whose precondition
    /// asserts `key` was last committed at `ref_index`?
    pub fn check(&self, key: &[u8], ref_index: TxIndex, tx_index: TxIndex) -> CheckResult {
        let pending = self.has_pending_below(key, tx_index);
        let ok = !pending && self.last_committed_below(key, tx_index) == ref_index;
        CheckResult { ok, pending }
    }

    /// Committed `(key, value, index)` triples whose keys start with
    /// `prefix`, in key order, at most `limit` entries. Pending versions are
    /// excluded; the latest committed version is reported per key.
    pub fn range_scan(&self, prefix: &[u8], limit: usize) -> Vec<(Vec<u8>, Vec<u8>, TxIndex)> {
        self.keys
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter_map(|(k, kv)| {
                let v = kv.committed.last()?;
                Some((k.clone(), v.value.clone(), v.index))
            })
            .take(limit)
            .collect()
    }

    /// Current statistics snapshot
    pub fn stats(&self) -> ViewStats {
        ViewStats {
            partition: self.partition,
            last_applied_index: self.last_applied,
            resume_offset: self.resume_from,
            key_count: self.key_count,
            fact_count: self.fact_count,
            committed_version_count: self.committed_versions,
            pending_tx_count: self.pending_txs,
            resolved_tx_count: self.resolved_txs,
            malformed_record_count: self.malformed_records,
            unknown_decision_count: self.unknown_decisions,
            anomaly_count: self.anomalies,
        }
    }

    /// Administrative reset: drop all materialized state and resume
    /// materialization at `resume_from` (records below it are skipped).
    pub fn wipe(&mut self, resume_from: Offset) {
        let partition = self.partition;
        *self = ViewState::new(partition);
        self.resume_from = resume_from;
        self.last_applied = resume_from;
    }
}
