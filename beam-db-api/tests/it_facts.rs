//! Fact-keyed storage: order-preserving keys driving range scans

mod support;

use beam_db_core::keys::{
    encode_pos, encode_spo, key_prefix_predicate, key_prefix_subject,
    key_prefix_subject_predicate, parse_key, PosPrefix, Spec, SpoPrefix,
};
use beam_db_core::{Fact, KGObject};
use support::fast_db;

/// Act as the ingest tier: each fact is stored under both of its index
/// keys, with the index field carrying the log position of the SPO write.
async fn ingest(db: &beam_db_api::BeamDb, mut fact: Fact) -> Fact {
    let spo_probe = encode_spo(&fact, SpoPrefix::Full);
    let (_, offset) = db.write_one(&spo_probe, b"").await.unwrap();
    // Stamp the assigned position and store under the final keys.
    fact.index = offset + 1;
    let spo = encode_spo(&fact, SpoPrefix::Full);
    let pos = encode_pos(&fact, PosPrefix::Full);
    db.write_one(&spo, b"").await.unwrap();
    db.write_one(&pos, b"").await.unwrap();
    db.sync().await.unwrap();
    fact
}

#[tokio::test]
async fn facts_scan_by_subject_in_order() {
    let db = fast_db();
    let mut stored = Vec::new();
    for (s, p, o) in [
        (7, 1, KGObject::string("alpha", 0)),
        (7, 1, KGObject::string("beta", 0)),
        (7, 2, KGObject::int64(42, 0)),
        (8, 1, KGObject::string("other subject", 0)),
    ] {
        stored.push(ingest(&db, Fact::new(s, p, o, 1000 + s + p, 0)).await);
    }

    let hits = db.range_scan(&key_prefix_subject(7), 100).await.unwrap();
    // Ordered: the probe key (index 0) sorts before its final key.
    let mut prev: Vec<u8> = Vec::new();
    for hit in &hits {
        assert!(hit.key > prev);
        prev = hit.key.clone();
    }
    // Every scanned key parses back to a fact for subject 7.
    let mut subject_facts = 0;
    for hit in &hits {
        let Spec::Fact { fact, .. } = parse_key(&hit.key).unwrap() else {
            panic!("non-fact key under fspo prefix");
        };
        assert_eq!(fact.subject, 7);
        if fact.index > 0 {
            subject_facts += 1;
        }
    }
    assert_eq!(subject_facts, 3);

    let narrowed = db
        .range_scan(&key_prefix_subject_predicate(7, 1), 100)
        .await
        .unwrap();
    for hit in &narrowed {
        let Spec::Fact { fact, .. } = parse_key(&hit.key).unwrap() else {
            panic!("non-fact key");
        };
        assert_eq!((fact.subject, fact.predicate), (7, 1));
    }
}

#[tokio::test]
async fn facts_scan_by_predicate_across_subjects() {
    let db = fast_db();
    for (s, o) in [
        (3, KGObject::kid(500)),
        (9, KGObject::kid(500)),
        (5, KGObject::kid(501)),
    ] {
        ingest(&db, Fact::new(s, 77, o, 2000 + s, 0)).await;
    }
    // A different predicate that must not appear in the scan.
    ingest(&db, Fact::new(3, 78, KGObject::kid(500), 2999, 0)).await;

    let hits = db.range_scan(&key_prefix_predicate(77), 100).await.unwrap();
    assert!(!hits.is_empty());
    let mut subjects = Vec::new();
    for hit in &hits {
        let Spec::Fact { fact, .. } = parse_key(&hit.key).unwrap() else {
            panic!("non-fact key under fpos prefix");
        };
        assert_eq!(fact.predicate, 77);
        if fact.index > 0 {
            subjects.push(fact.subject);
        }
    }
    // POS order groups by object, then subject: kid(500) carriers first.
    assert_eq!(subjects, vec![3, 9, 5]);
}

#[tokio::test]
async fn fact_count_tracks_spo_keys() {
    let db = fast_db();
    ingest(&db, Fact::new(1, 2, KGObject::boolean(true, 0), 3, 0)).await;
    db.write_one(b"plain-key", b"v").await.unwrap();
    db.sync().await.unwrap();

    let stats = db.stats().await.unwrap();
    // Probe + final SPO key for the fact; the POS twin and the plain key
    // are not counted as facts.
    assert_eq!(stats.fact_count, 2);
    assert_eq!(stats.key_count, 4);
}
