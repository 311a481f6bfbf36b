//! Storage error types.

use depot_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target location is already occupied.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A storage path escapes the storage root or is otherwise malformed.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    /// Uploaded bytes do not hash to the object id they were stored under.
    #[error("content does not match oid {oid}: got {actual}")]
    ContentMismatch {
        /// Declared object id.
        oid: String,
        /// Hash of the received content.
        actual: String,
    },

    /// The URL signing key was rejected.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The backing service reported an error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StorageError::InvalidPath(_)
            | StorageError::ContentMismatch { .. }
            | StorageError::InvalidKey(_) => {
                ErrorKind::InvalidInput
            }
            StorageError::Io(_) | StorageError::Backend(_) => ErrorKind::Unavailable,
        }
    }
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
