//! Coordinator flow
//!
//! ```text
//! snapshot  -> fetch each input key, capture (value, index)
//! propose   -> append Transaction{conds, writes}; tx = offset + 1
//! poll      -> check(key, snapshot_index, tx) per condition key until the
//!              answer is knowable, with jittered sleeps, bounded by the
//!              deadline
//! decide    -> append Decision{tx, commit}
//! ```
//!
//! A transaction at log index `t` only ever waits on transactions with
//! indexes below `t`, so waiter chains are acyclic. A coordinator that
//! reaches its deadline appends an aborting decision so the transaction
//! cannot wedge later ones forever.

use crate::error::{Result, TxnError};
use beam_db_core::record::{Condition, DecisionRecord, LogRecord, TransactionRecord, WriteRecord};
use beam_db_core::TxIndex;
use beam_db_log::{partition_for_key, LogBroker, Offset, Partition};
use beam_db_view::FactView;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Tunables for the coordinator's poll loop
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Base sleep between check polls
    pub check_interval: Duration,
    /// Random extra sleep added to each poll, spreading contending pollers
    pub check_jitter: Duration,
    /// Total budget from propose to decision; expiry appends an abort
    pub deadline: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            check_jitter: Duration::from_millis(250),
            deadline: Duration::from_secs(10),
        }
    }
}

/// Outcome of a committed transaction
#[derive(Clone, Debug)]
pub struct TxnReceipt {
    /// Partition the transaction and its decision were appended to
    pub partition: Partition,
    /// The transaction's log index
    pub tx_index: TxIndex,
    /// Offset of the decision record
    pub decision_offset: Offset,
    /// Snapshot the preconditions were built from: (key, index) pairs
    pub snapshot: Vec<(Vec<u8>, TxIndex)>,
}

/// Coordinates conditional multi-key writes.
pub struct Coordinator {
    broker: Arc<dyn LogBroker>,
    views: Arc<dyn FactView>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        broker: Arc<dyn LogBroker>,
        views: Arc<dyn FactView>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            broker,
            views,
            config,
        }
    }

    /// The `(k1, k2) -> k3` operation: read both inputs, write their
    /// concatenation (joined by `+`) to `k3` iff neither input moved.
    ///
    /// `decision_delay` postpones the decision append; a test hook for
    /// exercising timeout behavior in overlapping transactions.
    pub async fn concat(
        &self,
        k1: &[u8],
        k2: &[u8],
        k3: &[u8],
        decision_delay: Option<Duration>,
    ) -> Result<TxnReceipt> {
        self.ensure_same_partition(&[k1, k2, k3])?;

        // Snapshot reads. Absent keys read as empty at index 0; the
        // precondition then asserts continued absence.
        let (v1, i1) = self.snapshot_read(k1).await?;
        let (v2, i2) = self.snapshot_read(k2).await?;

        let mut value = v1;
        value.push(b'+');
        value.extend_from_slice(&v2);

        let conditions = vec![Condition::new(k1, i1), Condition::new(k2, i2)];
        let writes = vec![WriteRecord::new(k3, value)];
        self.submit(conditions, writes, decision_delay).await
    }

    /// Propose, poll, and decide a conditional write batch.
    pub async fn submit(
        &self,
        conditions: Vec<Condition>,
        writes: Vec<WriteRecord>,
        decision_delay: Option<Duration>,
    ) -> Result<TxnReceipt> {
        let keys: Vec<&[u8]> = conditions
            .iter()
            .map(|c| c.key.as_slice())
            .chain(writes.iter().map(|w| w.key.as_slice()))
            .collect();
        self.ensure_same_partition(&keys)?;
        let partition_key = keys
            .first()
            .copied()
            .unwrap_or(b"")
            .to_vec();

        let snapshot: Vec<(Vec<u8>, TxIndex)> = conditions
            .iter()
            .map(|c| (c.key.clone(), c.index))
            .collect();

        let proposal = LogRecord::Transaction(TransactionRecord {
            conditions: conditions.clone(),
            writes,
        })
        .encode()?;
        let (partition, offset) = self.broker.append(&partition_key, proposal).await?;
        let tx_index = offset + 1;
        let deadline = Instant::now() + self.config.deadline;
        tracing::debug!(partition, tx_index, "transaction proposed");

        // Poll each precondition until its outcome is knowable relative to
        // this transaction. A pending answer means an earlier overlapping
        // transaction has not decided yet.
        let mut commit = true;
        let mut stale_key: Option<Vec<u8>> = None;
        'conditions: for cond in &conditions {
            loop {
                let check = match self.views.check(&cond.key, cond.index, tx_index).await {
                    Ok(check) => check,
                    Err(e) => {
                        // Best-effort abort so the proposal cannot wedge
                        // later transactions, then surface the read failure.
                        self.append_decision(&partition_key, tx_index, false).await?;
                        return Err(e.into());
                    }
                };
                if !check.pending {
                    if !check.ok {
                        commit = false;
                        stale_key = Some(cond.key.clone());
                        break 'conditions;
                    }
                    break;
                }
                if Instant::now() >= deadline {
                    tracing::warn!(tx_index, "deadline reached, aborting transaction");
                    self.append_decision(&partition_key, tx_index, false).await?;
                    return Err(TxnError::Timeout { tx_index });
                }
                tracing::debug!(
                    tx_index,
                    key = %String::from_utf8_lossy(&cond.key),
                    "outcome pending an earlier transaction, sleeping"
                );
                tokio::time::sleep_until(deadline.min(Instant::now() + self.poll_interval()))
                    .await;
            }
        }

        if let Some(delay) = decision_delay {
            tokio::time::sleep(delay).await;
        }

        let decision_offset = self.append_decision(&partition_key, tx_index, commit).await?;
        if commit {
            tracing::info!(tx_index, decision_offset, "transaction committed");
            Ok(TxnReceipt {
                partition,
                tx_index,
                decision_offset,
                snapshot,
            })
        } else {
            let key = String::from_utf8_lossy(&stale_key.unwrap_or_default()).into_owned();
            tracing::info!(tx_index, key = %key, "transaction aborted by precondition");
            Err(TxnError::Conflict { key, tx_index })
        }
    }

    async fn snapshot_read(&self, key: &[u8]) -> Result<(Vec<u8>, TxIndex)> {
        Ok(self
            .views
            .fetch(key)
            .await?
            .map(|v| (v.value, v.index))
            .unwrap_or((Vec::new(), 0)))
    }

    async fn append_decision(
        &self,
        partition_key: &[u8],
        tx_index: TxIndex,
        commit: bool,
    ) -> Result<Offset> {
        let record = LogRecord::Decision(DecisionRecord { tx_index, commit }).encode()?;
        let (_, offset) = self.broker.append(partition_key, record).await?;
        Ok(offset)
    }

    fn poll_interval(&self) -> Duration {
        let jitter_ms = self.config.check_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.config.check_interval + jitter
    }

    fn ensure_same_partition(&self, keys: &[&[u8]]) -> Result<()> {
        let partitions = self.broker.partition_count();
        let mut routed = keys
            .iter()
            .map(|k| partition_for_key(k, partitions));
        let Some(first) = routed.next() else {
            return Ok(());
        };
        if routed.all(|p| p == first) {
            Ok(())
        } else {
            let described = keys
                .iter()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            Err(TxnError::CrossPartition(described))
        }
    }
}
