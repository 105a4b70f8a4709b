//! HTTP surface for the beam fact store
//!
//! A thin axum shell over `beam-db-api`: single-key reads/writes, raw
//! record appends, the conditional concat flow, the load generator, range
//! scans, statistics, and the administrative wipe.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;

use std::sync::Arc;

/// The server: configuration plus the embedded store.
pub struct BeamServer {
    state: Arc<AppState>,
}

impl BeamServer {
    /// Build the store and application state from config.
    pub fn new(config: ServerConfig) -> std::result::Result<Self, String> {
        config.validate()?;
        let state = Arc::new(AppState::new(config));
        Ok(Self { state })
    }

    /// Shared application state (exposed for embedding and tests)
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.listen_addr;
        let router = routes::build_router(self.state);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");
        axum::serve(listener, router).await
    }
}
