use thiserror::Error;

/// Errors that can occur when reading or writing persisted client state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key contains characters that cannot be used as a storage name.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
