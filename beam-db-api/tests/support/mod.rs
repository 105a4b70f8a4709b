//! Shared helpers for integration tests

use beam_db_api::{BeamDb, BeamDbConfig};
use beam_db_transact::CoordinatorConfig;
use std::time::Duration;

/// Config with fast polling so tests are not pacing on production sleeps.
pub fn fast_config() -> BeamDbConfig {
    BeamDbConfig {
        partitions: 1,
        txn: CoordinatorConfig {
            check_interval: Duration::from_millis(5),
            check_jitter: Duration::from_millis(2),
            deadline: Duration::from_secs(2),
        },
    }
}

pub fn fast_db() -> BeamDb {
    BeamDb::in_memory(fast_config())
}

/// Write and wait until the value is readable; returns its index.
pub async fn put(db: &BeamDb, key: &str, value: &str) -> u64 {
    let (_, offset) = db.write_one(key.as_bytes(), value.as_bytes()).await.unwrap();
    db.sync().await.unwrap();
    offset + 1
}

/// Fetch as (value, index), with (empty, 0) for absent keys.
pub async fn get(db: &BeamDb, key: &str) -> (Vec<u8>, u64) {
    db.fetch(key.as_bytes())
        .await
        .unwrap()
        .map(|v| (v.value, v.index))
        .unwrap_or((Vec::new(), 0))
}

/// fetch_at as (value, index), with (empty, 0) for absent versions.
pub async fn get_at(db: &BeamDb, key: &str, at: u64) -> (Vec<u8>, u64) {
    db.fetch_at(key.as_bytes(), at)
        .await
        .unwrap()
        .map(|v| (v.value, v.index))
        .unwrap_or((Vec::new(), 0))
}
