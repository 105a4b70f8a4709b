//! Point reads/writes, raw appends, scans, and the load generator

use crate::error::{Result, ServerError};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use beam_db_log::{Offset, Partition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an appended record landed
#[derive(Serialize)]
pub struct PlacementResponse {
    pub partition: Partition,
    pub offset: Offset,
}

#[derive(Deserialize)]
pub struct FetchParams {
    k: String,
    idx: Option<u64>,
}

/// GET /k?k=K[&idx=I]
///
/// Body is the raw value; 404 when the key (or version) is absent.
pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FetchParams>,
) -> Result<Response> {
    let found = match params.idx {
        Some(idx) => state.db.fetch_at(params.k.as_bytes(), idx).await?,
        None => state.db.fetch(params.k.as_bytes()).await?,
    };
    match found {
        Some(v) if v.index > 0 => Ok((StatusCode::OK, v.value).into_response()),
        _ => Err(ServerError::not_found(format!(
            "key '{}' doesn't exist",
            params.k
        ))),
    }
}

#[derive(Deserialize)]
pub struct KeyParam {
    k: String,
}

/// POST /k?k=K with the value as the request body
pub async fn write_one(
    State(state): State<Arc<AppState>>,
    Query(params): Query<KeyParam>,
    body: Bytes,
) -> Result<Json<PlacementResponse>> {
    let (partition, offset) = state.db.write_one(params.k.as_bytes(), &body).await?;
    Ok(Json(PlacementResponse { partition, offset }))
}

/// POST /append with a pre-encoded record as the request body
pub async fn append(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PlacementResponse>> {
    let (partition, offset) = state.db.append_raw(body.to_vec()).await?;
    Ok(Json(PlacementResponse { partition, offset }))
}

#[derive(Deserialize)]
pub struct FillParams {
    n: Option<usize>,
}

#[derive(Serialize)]
pub struct FillResponse {
    pub appended: usize,
}

const FILL_DEFAULT: usize = 1000;
const FILL_MAX: usize = 100_000;

/// POST /fill[?n=N]: append N random key/value writes
pub async fn fill(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FillParams>,
) -> Result<Json<FillResponse>> {
    let n = params.n.unwrap_or(FILL_DEFAULT);
    if n > FILL_MAX {
        return Err(ServerError::bad_request(format!(
            "n = {n} exceeds maximum {FILL_MAX}"
        )));
    }
    let placements = state.db.fill(n).await?;
    Ok(Json(FillResponse {
        appended: placements.len(),
    }))
}

#[derive(Deserialize)]
pub struct ScanParams {
    prefix: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ScanItem {
    pub key: String,
    pub value: String,
    pub index: u64,
}

const SCAN_DEFAULT_LIMIT: usize = 100;

/// GET /scan?prefix=P[&limit=N]: committed entries under a key prefix
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScanParams>,
) -> Result<Json<Vec<ScanItem>>> {
    let limit = params.limit.unwrap_or(SCAN_DEFAULT_LIMIT);
    let entries = state.db.range_scan(params.prefix.as_bytes(), limit).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|e| ScanItem {
                key: String::from_utf8_lossy(&e.key).into_owned(),
                value: String::from_utf8_lossy(&e.value).into_owned(),
                index: e.index,
            })
            .collect(),
    ))
}
