//! Error types for the auth crate.

use depot_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur in authorization operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller lacks permission for the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The operation is reserved for the repository owner.
    #[error("only the repository owner can {0}")]
    NotOwner(String),

    /// The resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A permission string did not name a known level.
    #[error("invalid permission string: {0}")]
    InvalidPermission(String),

    /// The collaborator store failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::AccessDenied(_) => ErrorKind::AccessDenied,
            AuthError::NotOwner(_) => ErrorKind::NotOwner,
            AuthError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AuthError::InvalidInput(_) | AuthError::InvalidPermission(_) => {
                ErrorKind::InvalidInput
            }
            AuthError::Backend(_) => ErrorKind::Unavailable,
        }
    }
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
