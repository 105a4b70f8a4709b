//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beam_db_api::ApiError;
use beam_db_transact::TxnError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error type wrapping API errors with HTTP status mapping
#[derive(Error, Debug)]
pub enum ServerError {
    /// Store layer error
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Malformed request surface input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing key or version
    #[error("{0}")]
    NotFound(String),
}

impl ServerError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        ServerError::NotFound(msg.into())
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 - client input problems
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Api(ApiError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ServerError::Api(ApiError::Txn(TxnError::CrossPartition(_))) => {
                StatusCode::BAD_REQUEST
            }

            // 404
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 - aborted by precondition
            ServerError::Api(ApiError::Txn(TxnError::Conflict { .. })) => StatusCode::CONFLICT,

            // 504 - deadlines
            ServerError::Api(ApiError::Txn(TxnError::Timeout { .. })) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ServerError::Api(ApiError::Deadline(_)) => StatusCode::GATEWAY_TIMEOUT,

            // 503 - backing services unavailable
            ServerError::Api(ApiError::Log(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Api(ApiError::View(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Api(ApiError::Txn(TxnError::Log(_))) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Api(ApiError::Txn(TxnError::View(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 - everything else
            ServerError::Api(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(r#"{{"error":"{}","status":{}}}"#, self, status.as_u16())
        });
        (status, [("content-type", "application/json")], json).into_response()
    }
}
