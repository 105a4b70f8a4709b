//! Error types for beam-db-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core codec error type
#[derive(Error, Debug)]
pub enum Error {
    /// Record or key serialization failure
    #[error("Encode error: {0}")]
    Encode(String),

    /// Record or key deserialization failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Key bytes whose prefix names no known key family
    #[error("Unknown key type: {0}")]
    UnknownKeyType(String),

    /// Input ended before the declared length
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

impl Error {
    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        Error::Encode(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Create an unknown-key-type error from the offending key bytes
    pub fn unknown_key_type(key: &[u8]) -> Self {
        Error::UnknownKeyType(String::from_utf8_lossy(key).into_owned())
    }
}
