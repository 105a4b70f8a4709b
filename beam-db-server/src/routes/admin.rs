//! Admin endpoints: /health, /stats, /wipe

use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use beam_db_api::{DbStats, WipeMarker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Statistics response
#[derive(Serialize)]
pub struct StatsResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Server version
    pub version: &'static str,
    /// Store counters, aggregated and per partition
    #[serde(flatten)]
    pub stats: DbStats,
}

/// GET /stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let stats = state.db.stats().await?;
    Ok(Json(StatsResponse {
        uptime_secs: state.uptime_secs(),
        version: env!("CARGO_PKG_VERSION"),
        stats,
    }))
}

#[derive(Deserialize)]
pub struct WipeParams {
    /// Seconds to wait for views to confirm the reset
    wait: Option<u64>,
}

#[derive(Serialize)]
pub struct WipeResponse {
    pub wiped: Vec<WipeMarker>,
}

const WIPE_DEFAULT_WAIT_SECS: u64 = 10;

/// POST /wipe[?wait=SECS]
///
/// Clears every partition view and rewinds its materialization marker to
/// the current log end.
pub async fn wipe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WipeParams>,
) -> Result<Json<WipeResponse>> {
    let wait = Duration::from_secs(params.wait.unwrap_or(WIPE_DEFAULT_WAIT_SECS));
    tracing::info!(wait_secs = wait.as_secs(), "wipe requested");
    let wiped = state.db.wipe(wait).await?;
    Ok(Json(WipeResponse { wiped }))
}
