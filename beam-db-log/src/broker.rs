//! Broker contract
//!
//! Implementations must provide a per-partition total order: `append`
//! returns the partition the payload landed in and its monotonic offset,
//! and `tail` replays that partition from any offset and then follows the
//! live end.

use crate::error::Result;
use async_trait::async_trait;

/// Partition id within a broker
pub type Partition = u32;

/// 0-based record position within a partition
pub type Offset = u64;

/// A partitioned, totally ordered, durable log.
///
/// The producer side must be safe for concurrent appends.
#[async_trait]
pub trait LogBroker: Send + Sync {
    /// Append an opaque payload, routed by `partition_key`.
    ///
    /// Returns the partition and the offset the payload was assigned.
    async fn append(&self, partition_key: &[u8], payload: Vec<u8>) -> Result<(Partition, Offset)>;

    /// Tail a partition starting at `from` (inclusive).
    ///
    /// The cursor yields every stored record in offset order and then waits
    /// for new appends.
    async fn tail(&self, partition: Partition, from: Offset) -> Result<Box<dyn LogCursor>>;

    /// The offset the next append to `partition` will be assigned.
    async fn end_offset(&self, partition: Partition) -> Result<Offset>;

    /// Number of partitions this broker is configured with.
    fn partition_count(&self) -> u32;
}

/// A tailing consumer over one partition.
#[async_trait]
pub trait LogCursor: Send {
    /// Next record in offset order; waits when caught up with the end.
    async fn next(&mut self) -> Result<(Offset, Vec<u8>)>;
}
