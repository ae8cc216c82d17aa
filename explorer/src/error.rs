use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure talking to one of the upstream data sources.
///
/// None of these are fatal: the feed controller degrades on every variant
/// (switches backend, stops growing, or reports an absent sender).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The indexed GraphQL service rejected the query or could not be reached.
    #[error("Indexer query failed: {0}")]
    Query(String),

    /// The node REST API was unreachable or answered with a non-2xx status.
    #[error("Node request failed: {0}")]
    Transport(String),

    /// The upstream answered but the payload could not be decoded.
    #[error("Invalid upstream payload: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl FetchError {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Application error codes for structured error responses
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    UpstreamError,
}

/// Structured error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
}

/// Application error type with HTTP status mapping
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn upstream_error(msg: impl Into<String>) -> Self {
        Self::UpstreamError(msg.into())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::UpstreamError(_) => ErrorCode::UpstreamError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = ?error_code,
            status = %status.as_u16(),
            message = %message,
            "request error"
        );

        let body = ErrorResponse {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(msg) => Self::not_found(msg),
            other => Self::upstream_error(other.to_string()),
        }
    }
}
