//! Conditional multi-key transaction endpoint

use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
pub struct ConcatParams {
    k1: String,
    k2: String,
    k3: String,
    /// Seconds to hold the decision open (test hook for timeout paths)
    w: Option<u64>,
}

#[derive(Serialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub index: u64,
}

/// Trace of a committed transaction
#[derive(Serialize)]
pub struct ConcatResponse {
    pub committed: bool,
    pub partition: u32,
    pub tx_index: u64,
    pub decision_offset: u64,
    pub snapshot: Vec<SnapshotEntry>,
}

/// POST /concat?k1=&k2=&k3=[&w=SECS]
///
/// Runs the coordinator flow `(k1, k2) -> k3`. Responds 409 when the
/// transaction aborts on a stale snapshot and 504 when it times out behind
/// undecided overlapping transactions.
pub async fn concat(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConcatParams>,
) -> Result<Json<ConcatResponse>> {
    let delay = params.w.map(Duration::from_secs);
    let receipt = state
        .db
        .concat(
            params.k1.as_bytes(),
            params.k2.as_bytes(),
            params.k3.as_bytes(),
            delay,
        )
        .await?;
    Ok(Json(ConcatResponse {
        committed: true,
        partition: receipt.partition,
        tx_index: receipt.tx_index,
        decision_offset: receipt.decision_offset,
        snapshot: receipt
            .snapshot
            .into_iter()
            .map(|(key, index)| SnapshotEntry {
                key: String::from_utf8_lossy(&key).into_owned(),
                index,
            })
            .collect(),
    }))
}
