//! Beam server binary
//!
//! Run with: `cargo run -p beam-db-server -- --help`

use beam_db_server::telemetry::init_logging;
use beam_db_server::{BeamServer, ServerConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        partitions = config.partitions,
        txn_deadline_secs = config.txn_deadline_secs,
        "Starting beam server"
    );

    let server = BeamServer::new(config)?;
    server.run().await.map_err(Into::into)
}
