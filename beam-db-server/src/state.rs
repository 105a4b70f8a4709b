//! Application state shared across request handlers

use crate::config::ServerConfig;
use beam_db_api::{BeamDb, BeamDbConfig};
use std::time::Instant;

/// Shared state behind `Arc` via axum's State extractor
pub struct AppState {
    /// The embedded store
    pub db: BeamDb,
    /// Server configuration
    pub config: ServerConfig,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Build the store from server configuration
    pub fn new(config: ServerConfig) -> Self {
        let db = BeamDb::in_memory(BeamDbConfig {
            partitions: config.partitions,
            txn: config.txn_config(),
        });
        Self {
            db,
            config,
            start_time: Instant::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
