//! HTTP route handlers and router configuration

mod admin;
mod kv;
mod txn;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Health + stats
        .route("/health", get(admin::health))
        .route("/stats", get(admin::stats))
        // Point reads and writes
        .route("/k", get(kv::fetch).post(kv::write_one))
        // Raw record append (testing)
        .route("/append", post(kv::append))
        // Conditional multi-key transaction
        .route("/concat", post(txn::concat))
        // Load generator
        .route("/fill", post(kv::fill))
        // Committed range scan
        .route("/scan", get(kv::scan))
        // Administrative reset
        .route("/wipe", post(admin::wipe))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if state.config.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}
