//! Administrative operations: stats, fill, scans, wipe, replay

mod support;

use beam_db_api::{BeamDb, BeamDbConfig};
use beam_db_log::MemoryLog;
use std::sync::Arc;
use std::time::Duration;
use support::{fast_config, fast_db, get, put};

#[tokio::test]
async fn stats_aggregate_counters() {
    let db = fast_db();
    put(&db, "a", "1").await;
    put(&db, "a", "2").await;
    put(&db, "b", "3").await;
    db.concat(b"a", b"b", b"c", None).await.unwrap();
    db.sync().await.unwrap();

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.key_count, 3);
    assert_eq!(stats.committed_version_count, 4);
    assert_eq!(stats.pending_tx_count, 0);
    assert_eq!(stats.resolved_tx_count, 1);
    assert_eq!(stats.partitions.len(), 1);
    assert_eq!(stats.partitions[0].last_applied_index, 5);
}

#[tokio::test]
async fn fill_appends_random_writes() {
    let db = fast_db();
    let placements = db.fill(50).await.unwrap();
    assert_eq!(placements.len(), 50);
    db.sync().await.unwrap();

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.committed_version_count, 50);
    let hits = db.range_scan(b"key-", 100).await.unwrap();
    assert_eq!(hits.len(), stats.key_count as usize);
}

#[tokio::test]
async fn range_scan_merges_partitions_in_key_order() {
    let config = BeamDbConfig {
        partitions: 4,
        ..fast_config()
    };
    let db = BeamDb::in_memory(config);
    for i in 0..20 {
        put(&db, &format!("item/{i:02}"), "v").await;
    }

    let hits = db.range_scan(b"item/", 50).await.unwrap();
    assert_eq!(hits.len(), 20);
    for pair in hits.windows(2) {
        assert!(pair[0].key < pair[1].key);
    }

    let limited = db.range_scan(b"item/", 7).await.unwrap();
    assert_eq!(limited.len(), 7);
}

#[tokio::test]
async fn wipe_clears_state_and_resumes_at_log_end() {
    let db = fast_db();
    put(&db, "a", "1").await;
    put(&db, "b", "2").await;

    let markers = db.wipe(Duration::from_secs(1)).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].resume_offset, 2);

    assert_eq!(get(&db, "a").await, (Vec::new(), 0));
    let stats = db.stats().await.unwrap();
    assert_eq!(stats.key_count, 0);

    // New writes materialize normally after the wipe.
    put(&db, "c", "3").await;
    assert_eq!(get(&db, "c").await, (b"3".to_vec(), 3));
}

#[tokio::test]
async fn replay_from_the_same_log_is_identical() {
    let broker = Arc::new(MemoryLog::new(1));
    let db1 = BeamDb::with_broker(broker.clone(), fast_config());
    put(&db1, "a", "1").await;
    put(&db1, "b", "2").await;
    db1.concat(b"a", b"b", b"c", None).await.unwrap();
    db1.append_raw(b"junk".to_vec()).await.unwrap();
    put(&db1, "a", "9").await;
    db1.sync().await.unwrap();

    // A second instance over the same log must reach byte-identical state.
    let db2 = BeamDb::with_broker(broker, fast_config());
    db2.sync().await.unwrap();

    assert_eq!(
        db1.stats().await.unwrap().partitions,
        db2.stats().await.unwrap().partitions
    );
    for key in ["a", "b", "c"] {
        assert_eq!(get(&db1, key).await, get(&db2, key).await);
    }
}
