//! Embedded facade for the beam fact store
//!
//! [`BeamDb`] wires the pieces together: a log broker, one view replica per
//! partition (each with its consumer task), a key-routing read layer, and
//! the transaction coordinator. The HTTP surface in `beam-db-server` is a
//! thin shell over this crate.

pub mod db;
pub mod error;
pub mod router;

pub use db::{BeamDb, BeamDbConfig, DbStats, WipeMarker};
pub use error::{ApiError, Result};
pub use router::PartitionRouter;
