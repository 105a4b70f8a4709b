//! Logging initialization

use crate::config::{LogFormat, ServerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to info for our crates and warn elsewhere.
pub fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,beam_db_server=info,beam_db_api=info,beam_db_view=info,beam_db_transact=info,beam_db_log=info"));

    match config.log_format {
        LogFormat::Text => fmt().with_env_filter(filter).init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().init(),
    }
}
