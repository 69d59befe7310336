//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleet_render::RenderError;
use serde::Serialize;
use thiserror::Error;

/// Raised when the session task is gone
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is not running")]
    Closed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Map error: {0}")]
    Map(#[from] RenderError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recoverable: Option<bool>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, recoverable) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", None)
            }
            ApiError::Map(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "map_error",
                Some(e.is_recoverable()),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_type.into(),
            message: self.to_string(),
            recoverable,
        });

        (status, body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}
