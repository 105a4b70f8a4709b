//! Server configuration

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// Structured JSON lines
    Json,
}

/// Configuration for the beam server
#[derive(Debug, Clone, Parser)]
#[command(name = "beam-db-server", about = "Log-backed knowledge-graph fact store")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "BEAM_LISTEN_ADDR", default_value = "127.0.0.1:9980")]
    pub listen_addr: SocketAddr,

    /// Log partition count (keys shard by stable hash)
    #[arg(long, env = "BEAM_PARTITIONS", default_value_t = 1)]
    pub partitions: u32,

    /// Base sleep between conditional-commit check polls, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub check_interval_ms: u64,

    /// Random extra sleep added to each poll, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub check_jitter_ms: u64,

    /// Transaction budget from proposal to decision, in seconds; expiry
    /// appends an aborting decision
    #[arg(long, default_value_t = 10)]
    pub txn_deadline_secs: u64,

    /// Allow cross-origin requests
    #[arg(long, default_value_t = false)]
    pub cors_enabled: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        // Defaults are defined once, in the clap attributes.
        Self::parse_from::<_, &str>([])
    }
}

impl ServerConfig {
    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.partitions == 0 {
            return Err("--partitions must be at least 1".to_string());
        }
        if self.txn_deadline_secs == 0 {
            return Err("--txn-deadline-secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Coordinator tuning derived from the flags
    pub fn txn_config(&self) -> beam_db_transact::CoordinatorConfig {
        beam_db_transact::CoordinatorConfig {
            check_interval: Duration::from_millis(self.check_interval_ms),
            check_jitter: Duration::from_millis(self.check_jitter_ms),
            deadline: Duration::from_secs(self.txn_deadline_secs),
        }
    }
}
