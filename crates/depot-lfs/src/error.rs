//! LFS error types.

use depot_auth::AuthError;
use depot_repo::RepoError;
use depot_storage::StorageError;
use depot_types::{ErrorKind, LockId, RepositoryId};
use thiserror::Error;

use crate::LfsLock;

/// Errors that can occur during LFS operations.
#[derive(Debug, Error)]
pub enum LfsError {
    /// The repository does not exist.
    #[error("repository not found: {0}")]
    RepoNotFound(RepositoryId),

    /// LFS is disabled for the repository.
    #[error("LFS is not enabled for repository {0}")]
    LfsNotEnabled(RepositoryId),

    /// The object id is not a 64 character lowercase hex SHA-256.
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    /// The object is not in blob storage.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Stored and asserted sizes differ.
    #[error("size mismatch: expected {expected} bytes, found {actual} bytes")]
    SizeMismatch {
        /// Size the client asserted.
        expected: u64,
        /// Size in blob storage.
        actual: u64,
    },

    /// Another lock holds the path.
    #[error("lock already exists for path '{}'", .0.path)]
    LockAlreadyExists(Box<LfsLock>),

    /// The lock does not exist in this repository.
    #[error("lock not found: {0}")]
    LockNotFound(LockId),

    /// The caller may not release the lock.
    #[error("lock {0} is owned by another user")]
    LockNotOwned(LockId),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Authorization failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The repository store failed.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Blob storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LfsError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LfsError::RepoNotFound(_)
            | LfsError::LfsNotEnabled(_)
            | LfsError::ObjectNotFound(_)
            | LfsError::LockNotFound(_) => ErrorKind::NotFound,
            LfsError::InvalidOid(_) | LfsError::SizeMismatch { .. } | LfsError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            LfsError::LockAlreadyExists(_) | LfsError::LockNotOwned(_) => ErrorKind::Conflict,
            LfsError::Auth(e) => e.kind(),
            LfsError::Repo(e) => e.kind(),
            LfsError::Storage(e) => e.kind(),
        }
    }
}

/// A specialized Result type for LFS operations.
pub type Result<T> = std::result::Result<T, LfsError>;
