//! Shared view handle
//!
//! [`View`] wraps the materialized state for concurrent use: the consumer
//! task is the only writer, readers take short read locks, and the applied
//! transaction index is published through a watch channel so progress can be
//! observed without touching the state lock.

use crate::error::{Result, ViewError};
use crate::state::{CheckResult, VersionedValue, ViewState};
use crate::stats::ViewStats;
use async_trait::async_trait;
use beam_db_core::record::LogRecord;
use beam_db_core::TxIndex;
use beam_db_log::{Offset, Partition};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// One committed entry from a range scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub index: TxIndex,
}

/// Read contract over a partition's committed state.
///
/// Implemented by the local [`View`] and by routers that dispatch to the
/// view owning a key's partition.
#[async_trait]
pub trait FactView: Send + Sync {
    /// Latest committed value, or None if absent
    async fn fetch(&self, key: &[u8]) -> Result<Option<VersionedValue>>;

    /// Greatest committed version with index `<= at`, or None
    async fn fetch_at(&self, key: &[u8], at: TxIndex) -> Result<Option<VersionedValue>>;

    /// Conditional-commit check for a transaction at `tx_index` asserting
    /// `key` was last committed at `ref_index`
    async fn check(&self, key: &[u8], ref_index: TxIndex, tx_index: TxIndex)
        -> Result<CheckResult>;
}

/// A partition's view replica handle
pub struct View {
    partition: Partition,
    state: RwLock<ViewState>,
    applied_tx: watch::Sender<TxIndex>,
    applied_rx: watch::Receiver<TxIndex>,
    halted: AtomicBool,
}

impl View {
    /// Create an empty view for `partition`
    pub fn new(partition: Partition) -> Arc<Self> {
        let (applied_tx, applied_rx) = watch::channel(0);
        Arc::new(Self {
            partition,
            state: RwLock::new(ViewState::new(partition)),
            applied_tx,
            applied_rx,
            halted: AtomicBool::new(false),
        })
    }

    /// The partition this view consumes
    pub fn partition(&self) -> Partition {
        self.partition
    }

    fn ensure_available(&self) -> Result<()> {
        if self.halted.load(Ordering::Acquire) {
            return Err(ViewError::unavailable(format!(
                "partition {} consumer halted",
                self.partition
            )));
        }
        Ok(())
    }

    /// Fold one record; called by the consumer task only.
    pub(crate) fn apply(&self, offset: Offset, record: &LogRecord) {
        let applied = {
            let mut state = self.state.write();
            state.apply(offset, record);
            state.last_applied()
        };
        self.applied_tx.send_replace(applied);
    }

    /// Count an undecodable record; called by the consumer task only.
    pub(crate) fn record_malformed(&self, offset: Offset) {
        let applied = {
            let mut state = self.state.write();
            state.record_malformed(offset);
            state.last_applied()
        };
        self.applied_tx.send_replace(applied);
    }

    /// Mark the view unusable (log gap or broker failure). Readers fail
    /// with `ViewUnavailable` from here on.
    pub(crate) fn halt(&self, reason: &str) {
        tracing::error!(partition = self.partition, reason, "view halted");
        self.halted.store(true, Ordering::Release);
    }

    /// Whether the consumer has halted
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Synchronous fetch against current committed state
    pub fn fetch_local(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        self.ensure_available()?;
        Ok(self.state.read().fetch(key))
    }

    /// Synchronous fetch at a chosen index
    pub fn fetch_at_local(&self, key: &[u8], at: TxIndex) -> Result<Option<VersionedValue>> {
        self.ensure_available()?;
        Ok(self.state.read().fetch_at(key, at))
    }

    /// Synchronous conditional-commit check
    pub fn check_local(
        &self,
        key: &[u8],
        ref_index: TxIndex,
        tx_index: TxIndex,
    ) -> Result<CheckResult> {
        self.ensure_available()?;
        Ok(self.state.read().check(key, ref_index, tx_index))
    }

    /// Ordered committed entries under `prefix`, at most `limit`
    pub fn range_scan(&self, prefix: &[u8], limit: usize) -> Result<Vec<ScanEntry>> {
        self.ensure_available()?;
        Ok(self
            .state
            .read()
            .range_scan(prefix, limit)
            .into_iter()
            .map(|(key, value, index)| ScanEntry { key, value, index })
            .collect())
    }

    /// Current statistics snapshot
    pub fn stats(&self) -> Result<ViewStats> {
        self.ensure_available()?;
        Ok(self.state.read().stats())
    }

    /// Transaction index of the last applied record, without locking state
    pub fn last_applied(&self) -> TxIndex {
        *self.applied_rx.borrow()
    }

    /// A receiver observing the monotonic applied index
    pub fn applied(&self) -> watch::Receiver<TxIndex> {
        self.applied_rx.clone()
    }

    /// Wait until the view has applied records through `tx_index`
    pub async fn wait_for_applied(&self, tx_index: TxIndex) -> Result<()> {
        let mut rx = self.applied();
        loop {
            if *rx.borrow_and_update() >= tx_index {
                return Ok(());
            }
            self.ensure_available()?;
            if rx.changed().await.is_err() {
                return Err(ViewError::unavailable("view dropped"));
            }
        }
    }

    /// Administrative reset: clear state and resume materialization at
    /// `resume_from` (the log end at wipe time).
    pub fn wipe(&self, resume_from: Offset) {
        let applied = {
            let mut state = self.state.write();
            state.wipe(resume_from);
            state.last_applied()
        };
        self.applied_tx.send_replace(applied);
        tracing::info!(
            partition = self.partition,
            resume_from,
            "view wiped, materialization rewound"
        );
    }
}

#[async_trait]
impl FactView for View {
    async fn fetch(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        self.fetch_local(key)
    }

    async fn fetch_at(&self, key: &[u8], at: TxIndex) -> Result<Option<VersionedValue>> {
        self.fetch_at_local(key, at)
    }

    async fn check(
        &self,
        key: &[u8],
        ref_index: TxIndex,
        tx_index: TxIndex,
    ) -> Result<CheckResult> {
        self.check_local(key, ref_index, tx_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_db_core::record::WriteRecord;

    #[test]
    fn test_halted_view_rejects_reads() {
        let view = View::new(0);
        view.apply(0, &LogRecord::Write(WriteRecord::new("a", "1")));
        assert!(view.fetch_local(b"a").unwrap().is_some());

        view.halt("test");
        assert!(matches!(
            view.fetch_local(b"a"),
            Err(ViewError::Unavailable(_))
        ));
        assert!(matches!(view.stats(), Err(ViewError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_applied_watch_is_monotonic() {
        let view = View::new(0);
        let mut rx = view.applied();
        assert_eq!(*rx.borrow(), 0);

        view.apply(0, &LogRecord::Write(WriteRecord::new("a", "1")));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        view.apply(1, &LogRecord::Write(WriteRecord::new("a", "2")));
        view.wait_for_applied(2).await.unwrap();
        assert_eq!(view.last_applied(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_applied_after_wipe() {
        let view = View::new(0);
        view.apply(0, &LogRecord::Write(WriteRecord::new("a", "1")));
        view.wipe(5);
        // The wiped view counts as applied through its resume marker.
        view.wait_for_applied(5).await.unwrap();
        assert_eq!(view.fetch_local(b"a").unwrap(), None);
    }
}
