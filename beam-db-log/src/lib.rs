//! Ordered-log broker abstraction
//!
//! The store derives all state from a partitioned, totally ordered, durable
//! log. This crate defines the contract ([`LogBroker`]) that broker bindings
//! implement, the stable key→partition routing, and an in-memory broker used
//! for embedding and tests.
//!
//! Broker offsets are 0-based and monotonic per partition; an acknowledged
//! append is eventually visible to every tailer of its partition.

pub mod broker;
pub mod error;
pub mod memory;
pub mod route;

pub use broker::{LogBroker, LogCursor, Offset, Partition};
pub use error::{LogError, Result};
pub use memory::MemoryLog;
pub use route::partition_for_key;
