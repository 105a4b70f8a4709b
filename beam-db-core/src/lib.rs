//! Core types for the beam fact store
//!
//! This crate defines the wire identity of a fact and the two byte codecs
//! everything else is built on:
//!
//! - [`Fact`] / [`KGObject`]: the immutable subject-predicate-object tuple
//!   and its tagged object value.
//! - [`keys`]: order-preserving SPO / POS byte keys with five nested prefix
//!   families per index, used for range scans.
//! - [`record`]: the tagged log record union (`Write`, `Transaction`,
//!   `Decision`) and its self-describing binary encoding.
//!
//! Log offsets double as transaction indexes: the record observed at offset
//! `O` is addressed as transaction index `O + 1`, and index 0 is reserved to
//! mean "no such version".

pub mod error;
pub mod fact;
pub mod keys;
pub mod record;
mod varint;

pub use error::{Error, Result};
pub use fact::{Fact, KGObject, Precision};
pub use keys::{KeyEncoding, PosPrefix, Spec, SpoPrefix};
pub use record::{Condition, DecisionRecord, LogRecord, TransactionRecord, WriteRecord};

/// 1-based position of a record in its partition's log; doubles as the MVCC
/// version of everything the record wrote. 0 means "absent".
pub type TxIndex = u64;
