//! Error types for HTTP handlers.
//!
//! Bridges [`CommerceError`] and request-shape failures to HTTP responses
//! with a `{code, message}` JSON body.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shop_commerce::{CommerceError, ErrorKind};

/// Application error type for handlers.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    /// Create a new application error.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => Self::bad_request(err.to_string()),
            ErrorKind::NotFound => Self::not_found(err.to_string()),
            ErrorKind::Internal => {
                tracing::error!(error = %err, "cart operation failed");
                Self::internal("internal error")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code for client error handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                "Internal server error"
            );
        }

        let body = ErrorBody {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commerce_error_status_mapping() {
        let cases = [
            (CommerceError::InvalidQuantity(0), StatusCode::BAD_REQUEST),
            (
                CommerceError::ValidationError("product id is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CommerceError::QuantityExceedsLimit(10_000, 9999),
                StatusCode::BAD_REQUEST,
            ),
            (CommerceError::ProductNotFound("p".into()), StatusCode::NOT_FOUND),
            (CommerceError::CartNotFound("c".into()), StatusCode::NOT_FOUND),
            (CommerceError::ItemNotInCart("p".into()), StatusCode::NOT_FOUND),
            (
                CommerceError::DatabaseError("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = AppError::from(CommerceError::DatabaseError("secret dsn".into()));
        assert!(!err.to_string().contains("secret"));
    }
}
