//! In-memory broker
//!
//! Keeps every partition as an append-only `Vec` and wakes tailers through
//! a per-partition `Notify`. Used for embedded deployments and tests; a
//! production binding implements [`LogBroker`] against a real broker.

use crate::broker::{LogBroker, LogCursor, Offset, Partition};
use crate::error::{LogError, Result};
use crate::route::partition_for_key;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Notify;

struct PartitionLog {
    records: RwLock<Vec<Arc<Vec<u8>>>>,
    appended: Notify,
}

/// In-memory [`LogBroker`] with a configurable partition count.
#[derive(Clone)]
pub struct MemoryLog {
    partitions: Arc<Vec<PartitionLog>>,
}

impl MemoryLog {
    /// Create a broker with `partitions` partitions (minimum 1).
    pub fn new(partitions: u32) -> Self {
        let partitions = partitions.max(1);
        let logs = (0..partitions)
            .map(|_| PartitionLog {
                records: RwLock::new(Vec::new()),
                appended: Notify::new(),
            })
            .collect();
        Self {
            partitions: Arc::new(logs),
        }
    }

    fn partition(&self, partition: Partition) -> Result<&PartitionLog> {
        self.partitions
            .get(partition as usize)
            .ok_or(LogError::UnknownPartition(partition))
    }
}

impl std::fmt::Debug for MemoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryLog({} partitions)", self.partitions.len())
    }
}

#[async_trait]
impl LogBroker for MemoryLog {
    async fn append(&self, partition_key: &[u8], payload: Vec<u8>) -> Result<(Partition, Offset)> {
        let partition = partition_for_key(partition_key, self.partition_count());
        let log = self.partition(partition)?;
        let offset = {
            let mut records = log.records.write();
            records.push(Arc::new(payload));
            (records.len() - 1) as Offset
        };
        log.appended.notify_waiters();
        tracing::trace!(partition, offset, "appended record");
        Ok((partition, offset))
    }

    async fn tail(&self, partition: Partition, from: Offset) -> Result<Box<dyn LogCursor>> {
        self.partition(partition)?;
        Ok(Box::new(MemoryCursor {
            log: self.clone(),
            partition,
            next: from,
        }))
    }

    async fn end_offset(&self, partition: Partition) -> Result<Offset> {
        Ok(self.partition(partition)?.records.read().len() as Offset)
    }

    fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }
}

struct MemoryCursor {
    log: MemoryLog,
    partition: Partition,
    next: Offset,
}

#[async_trait]
impl LogCursor for MemoryCursor {
    async fn next(&mut self) -> Result<(Offset, Vec<u8>)> {
        let log = self
            .log
            .partitions
            .get(self.partition as usize)
            .ok_or(LogError::UnknownPartition(self.partition))?;
        loop {
            // Register for the wake-up before checking, so an append between
            // the check and the await cannot be missed.
            let appended = log.appended.notified();
            {
                let records = log.records.read();
                if (self.next as usize) < records.len() {
                    let offset = self.next;
                    let payload = records[offset as usize].as_ref().clone();
                    self.next += 1;
                    return Ok((offset, payload));
                }
            }
            appended.await;
        }
    }
}
