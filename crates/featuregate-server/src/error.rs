//! Error handling for the HTTP gateway
//!
//! This module defines how errors are converted to HTTP responses. Validation
//! and authorization failures map to 4xx responses with structured bodies;
//! backend failures are logged with full detail server-side and reported as
//! 500s.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Result type alias for HTTP handlers
pub type Result<T> = std::result::Result<T, AppError>;

/// Application errors that can occur in gateway handlers
///
/// This wraps the core error taxonomy and adds the HTTP-only cases.
#[derive(Debug)]
pub enum AppError {
    /// Requested resource does not exist (404)
    NotFound(String),

    /// Error from the core library, mapped by category
    Core(featuregate_core::Error),

    /// Unexpected server-side failure (500)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Core(err) => write!(f, "{}", err),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Convert AppError into an HTTP response
///
/// ## Error Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "VALIDATION_ERROR",
///     "message": "Invalid input: uneven entity columns"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use featuregate_core::Error as CoreError;

        let (status, error_code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Core(err) => match err {
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                CoreError::UnsupportedKeyType(_) => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED_KEY_TYPE")
                }
                CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                CoreError::Config(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
                }
                CoreError::Serialization(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                CoreError::Backend(_)
                | CoreError::RemoteGateway { .. }
                | CoreError::ProxyUnsupported(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "BACKEND_ERROR")
                }
            },
        };

        // Full detail stays in the server log; the client gets the message.
        if status.is_server_error() {
            tracing::error!(code = error_code, "request failed: {}", self);
        } else {
            tracing::warn!(code = error_code, "request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Error response sent to clients
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    code: String,
    /// Human-readable error message
    message: String,
}

impl From<featuregate_core::Error> for AppError {
    fn from(err: featuregate_core::Error) -> Self {
        AppError::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::NotFound("project 'demo'".to_string());
        assert_eq!(err.to_string(), "Not found: project 'demo'");
    }

    #[test]
    fn test_core_error_converts() {
        let core = featuregate_core::Error::validation("bad column");
        let app: AppError = core.into();
        assert!(matches!(app, AppError::Core(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_401() {
        let app: AppError = featuregate_core::Error::unauthorized("no session").into();
        let response = app.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_backend_maps_to_500_not_401() {
        let app: AppError = featuregate_core::Error::backend_msg("connection refused").into();
        let response = app.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
