//! Cart store error types.

use backend::BackendError;
use domain::DomainError;
use storage::StorageError;
use thiserror::Error;

/// Errors returned by cart store operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The operation needs a signed-in user.
    #[error("Authentication required")]
    AuthRequired,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CartError {
    pub const AUTH_REQUIRED: &'static str = "AUTH_REQUIRED";

    /// Machine-readable code for UI consumers.
    pub fn code(&self) -> Option<&str> {
        match self {
            CartError::AuthRequired => Some(Self::AUTH_REQUIRED),
            CartError::Backend(e) => e.code(),
            _ => None,
        }
    }
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartError>;
