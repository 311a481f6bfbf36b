//! Repository error types.

use depot_auth::AuthError;
use depot_storage::StorageError;
use depot_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The repository was not found.
    #[error("repository not found: {0}")]
    NotFound(String),

    /// The owner already has a repository with this slug.
    #[error("repository already exists: {0}")]
    AlreadyExists(String),

    /// The name does not produce a valid slug.
    #[error("invalid repository name: {0}")]
    InvalidName(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The owner has used up their storage quota.
    #[error("storage quota exceeded: {used} of {quota} bytes used")]
    QuotaExceeded {
        /// Bytes in use.
        used: u64,
        /// Allowed bytes.
        quota: i64,
    },

    /// The quota service failed.
    #[error("quota lookup failed: {0}")]
    Quota(String),

    /// Authorization failed or the collaborator store reported an error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Repository storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RepoError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::NotFound(_) => ErrorKind::NotFound,
            RepoError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RepoError::InvalidName(_) | RepoError::InvalidInput(_) => ErrorKind::InvalidInput,
            RepoError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            RepoError::Quota(_) => ErrorKind::Unavailable,
            RepoError::Auth(e) => e.kind(),
            RepoError::Storage(e) => e.kind(),
        }
    }
}

/// A specialized Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
