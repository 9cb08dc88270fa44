//! Backend error types.

use thiserror::Error;

/// Errors returned by backend collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend has fewer units than requested.
    #[error("Insufficient stock: {available} available")]
    InsufficientStock { available: u32 },

    /// No valid credentials were sent.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The backend answered with an error status.
    #[error("Backend returned {status}{}: {message}", code_suffix(.code))]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never got a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The collaborator is unavailable (used by the in-memory fakes).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

impl BackendError {
    /// Returns true if this is the structured stock-conflict signal.
    pub fn is_stock_conflict(&self) -> bool {
        matches!(self, BackendError::InsufficientStock { .. })
    }

    /// Units the backend reported as available, for stock conflicts.
    pub fn available(&self) -> Option<u32> {
        match self {
            BackendError::InsufficientStock { available } => Some(*available),
            _ => None,
        }
    }

    /// Machine-readable error code, when the backend sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::InsufficientStock { .. } => Some("INSUFFICIENT_STOCK"),
            BackendError::Unauthenticated => Some("UNAUTHENTICATED"),
            BackendError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::InvalidResponse(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::InvalidResponse(err.to_string())
    }
}

/// Convenience type alias for backend results.
pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_conflict_exposes_available() {
        let err = BackendError::InsufficientStock { available: 3 };
        assert!(err.is_stock_conflict());
        assert_eq!(err.available(), Some(3));
        assert_eq!(err.code(), Some("INSUFFICIENT_STOCK"));
        assert!(!BackendError::Timeout.is_stock_conflict());
    }

    #[test]
    fn status_display_includes_code() {
        let err = BackendError::Status {
            status: 400,
            code: Some("PRODUCT_NOT_FOUND".into()),
            message: "no such product".into(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned 400 (PRODUCT_NOT_FOUND): no such product"
        );
    }
}
