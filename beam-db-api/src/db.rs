//! The store facade
//!
//! Owns the broker handle, the per-partition views with their consumer
//! tasks, and the coordinator. Dispatches client operations: single-key
//! writes go straight to the log, conditional multi-key writes go through
//! the coordinator, reads go to the owning partition's view.

use crate::error::{ApiError, Result};
use crate::router::PartitionRouter;
use beam_db_core::record::{LogRecord, WriteRecord};
use beam_db_core::{keys, TxIndex};
use beam_db_log::{LogBroker, MemoryLog, Offset, Partition};
use beam_db_transact::{Coordinator, CoordinatorConfig, TxnReceipt};
use beam_db_view::{ScanEntry, VersionedValue, View, ViewConsumer, ViewStats};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Store configuration
#[derive(Clone, Debug)]
pub struct BeamDbConfig {
    /// Log partition count (keys shard by stable hash)
    pub partitions: u32,
    /// Coordinator poll/deadline tuning
    pub txn: CoordinatorConfig,
}

impl Default for BeamDbConfig {
    fn default() -> Self {
        Self {
            partitions: 1,
            txn: CoordinatorConfig::default(),
        }
    }
}

/// Aggregated statistics across all partition views
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DbStats {
    pub key_count: u64,
    pub fact_count: u64,
    pub committed_version_count: u64,
    pub pending_tx_count: u64,
    pub resolved_tx_count: u64,
    pub malformed_record_count: u64,
    pub partitions: Vec<ViewStats>,
}

/// Per-partition resume marker returned by a wipe
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WipeMarker {
    pub partition: Partition,
    pub resume_offset: Offset,
}

/// Embedded store instance
pub struct BeamDb {
    broker: Arc<dyn LogBroker>,
    router: Arc<PartitionRouter>,
    coordinator: Coordinator,
    consumers: Vec<tokio::task::JoinHandle<()>>,
}

impl BeamDb {
    /// Start a store over an in-memory broker.
    pub fn in_memory(config: BeamDbConfig) -> Self {
        let broker = Arc::new(MemoryLog::new(config.partitions));
        Self::with_broker(broker, config)
    }

    /// Start a store over an existing broker, spawning one view consumer
    /// per partition. State is rebuilt by replaying each partition.
    pub fn with_broker(broker: Arc<dyn LogBroker>, config: BeamDbConfig) -> Self {
        let mut views = Vec::with_capacity(broker.partition_count() as usize);
        let mut consumers = Vec::with_capacity(views.capacity());
        for partition in 0..broker.partition_count() {
            let view = View::new(partition);
            consumers.push(ViewConsumer::new(view.clone(), broker.clone(), 0).spawn());
            views.push(view);
        }
        let router = Arc::new(PartitionRouter::new(views));
        let coordinator = Coordinator::new(broker.clone(), router.clone(), config.txn);
        Self {
            broker,
            router,
            coordinator,
            consumers,
        }
    }

    /// The partition views, in partition order
    pub fn views(&self) -> &[Arc<View>] {
        self.router.views()
    }

    /// Append a single-key write. Returns the partition and offset the
    /// record landed at; the write becomes readable at index offset+1.
    pub async fn write_one(&self, key: &[u8], value: &[u8]) -> Result<(Partition, Offset)> {
        if key.is_empty() {
            return Err(ApiError::invalid_request("key must not be empty"));
        }
        if keys::is_reserved(key) {
            return Err(ApiError::invalid_request(format!(
                "key '{}' is reserved",
                String::from_utf8_lossy(key)
            )));
        }
        let payload = LogRecord::Write(WriteRecord::new(key, value)).encode()?;
        let placed = self.broker.append(key, payload).await?;
        tracing::debug!(
            key = %String::from_utf8_lossy(key),
            partition = placed.0,
            offset = placed.1,
            "write appended"
        );
        Ok(placed)
    }

    /// Append a pre-encoded record verbatim (testing hook). The payload is
    /// not validated; views count undecodable records and move on.
    pub async fn append_raw(&self, payload: Vec<u8>) -> Result<(Partition, Offset)> {
        let partition_key = payload.clone();
        Ok(self.broker.append(&partition_key, payload).await?)
    }

    /// Latest committed value of `key`
    pub async fn fetch(&self, key: &[u8]) -> Result<Option<VersionedValue>> {
        Ok(self.router.view_for_key(key)?.fetch_local(key)?)
    }

    /// Greatest committed version of `key` with index `<= at`
    pub async fn fetch_at(&self, key: &[u8], at: TxIndex) -> Result<Option<VersionedValue>> {
        Ok(self.router.view_for_key(key)?.fetch_at_local(key, at)?)
    }

    /// Conditional concatenation `(k1, k2) -> k3`; see the coordinator.
    pub async fn concat(
        &self,
        k1: &[u8],
        k2: &[u8],
        k3: &[u8],
        decision_delay: Option<Duration>,
    ) -> Result<TxnReceipt> {
        if keys::is_reserved(k3) {
            return Err(ApiError::invalid_request(format!(
                "key '{}' is reserved",
                String::from_utf8_lossy(k3)
            )));
        }
        Ok(self.coordinator.concat(k1, k2, k3, decision_delay).await?)
    }

    /// Load generator: append `n` random key/value writes.
    pub async fn fill(&self, n: usize) -> Result<Vec<(Partition, Offset)>> {
        let mut placements = Vec::with_capacity(n);
        for _ in 0..n {
            let (key, value) = {
                let mut rng = rand::thread_rng();
                (
                    format!("key-{:08x}", rng.gen::<u32>()),
                    format!("value-{:08x}", rng.gen::<u32>()),
                )
            };
            placements.push(self.write_one(key.as_bytes(), value.as_bytes()).await?);
        }
        Ok(placements)
    }

    /// Ordered committed entries under `prefix` across all partitions,
    /// merged by key, at most `limit`.
    pub async fn range_scan(&self, prefix: &[u8], limit: usize) -> Result<Vec<ScanEntry>> {
        let mut merged: Vec<ScanEntry> = Vec::new();
        for view in self.router.views() {
            merged.extend(view.range_scan(prefix, limit)?);
        }
        merged.sort_by(|a, b| a.key.cmp(&b.key));
        merged.truncate(limit);
        Ok(merged)
    }

    /// Aggregate statistics across partitions
    pub async fn stats(&self) -> Result<DbStats> {
        let mut partitions = Vec::with_capacity(self.router.views().len());
        for view in self.router.views() {
            partitions.push(view.stats()?);
        }
        Ok(DbStats {
            key_count: partitions.iter().map(|s| s.key_count).sum(),
            fact_count: partitions.iter().map(|s| s.fact_count).sum(),
            committed_version_count: partitions
                .iter()
                .map(|s| s.committed_version_count)
                .sum(),
            pending_tx_count: partitions.iter().map(|s| s.pending_tx_count).sum(),
            resolved_tx_count: partitions.iter().map(|s| s.resolved_tx_count).sum(),
            malformed_record_count: partitions
                .iter()
                .map(|s| s.malformed_record_count)
                .sum(),
            partitions,
        })
    }

    /// Administrative reset: clear every view and rewind each partition's
    /// materialization marker to the current log end, then wait up to
    /// `wait_for` for the views to confirm.
    pub async fn wipe(&self, wait_for: Duration) -> Result<Vec<WipeMarker>> {
        let mut markers = Vec::with_capacity(self.router.views().len());
        for view in self.router.views() {
            let end = self.broker.end_offset(view.partition()).await?;
            view.wipe(end);
            markers.push(WipeMarker {
                partition: view.partition(),
                resume_offset: end,
            });
        }
        for marker in &markers {
            let view = &self.router.views()[marker.partition as usize];
            tokio::time::timeout(wait_for, view.wait_for_applied(marker.resume_offset))
                .await
                .map_err(|_| {
                    ApiError::Deadline(format!(
                        "partition {} did not reach offset {} in time",
                        marker.partition, marker.resume_offset
                    ))
                })??;
        }
        tracing::info!(partitions = markers.len(), "store wiped");
        Ok(markers)
    }

    /// Block until every partition has applied records through the current
    /// log end. Test and admin helper.
    pub async fn sync(&self) -> Result<()> {
        for view in self.router.views() {
            let end = self.broker.end_offset(view.partition()).await?;
            view.wait_for_applied(end).await?;
        }
        Ok(())
    }
}

impl Drop for BeamDb {
    fn drop(&mut self) {
        for consumer in &self.consumers {
            consumer.abort();
        }
    }
}
