//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backend::{BackendError, ErrorBody};

/// Error returned by stub handlers. Rendered as the backend's error body
/// (`{ ok: false, error, message, available }`).
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request from the client.
    BadRequest(String),
    /// No bearer token on a call that needs one.
    Unauthorized,
    /// Error raised by one of the in-memory collaborators.
    Backend(BackendError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                error_body("BAD_REQUEST", message, None),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_body("UNAUTHENTICATED", "sign in required".to_string(), None),
            ),
            ApiError::Backend(err) => backend_error_to_response(err),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn error_body(code: &str, message: String, available: Option<u32>) -> ErrorBody {
    ErrorBody {
        ok: false,
        error: Some(code.to_string()),
        message: Some(message),
        available,
    }
}

fn backend_error_to_response(err: BackendError) -> (StatusCode, ErrorBody) {
    let message = err.to_string();
    match err {
        BackendError::InsufficientStock { available } => (
            StatusCode::BAD_REQUEST,
            error_body("INSUFFICIENT_STOCK", message, Some(available)),
        ),
        BackendError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, error_body("NOT_FOUND", message, None))
        }
        BackendError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            error_body("UNAUTHENTICATED", message, None),
        ),
        BackendError::Status {
            status,
            code,
            message,
        } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            error_body(code.as_deref().unwrap_or("ERROR"), message, None),
        ),
        BackendError::Unavailable(_) | BackendError::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body("UNAVAILABLE", message, None),
        ),
        BackendError::Transport(_) | BackendError::InvalidResponse(_) => {
            tracing::error!(error = %message, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("INTERNAL", message, None),
            )
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Backend(err)
    }
}
