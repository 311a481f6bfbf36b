//! Error types for pull request operations.

use depot_auth::AuthError;
use depot_repo::RepoError;
use depot_types::{ErrorKind, RepositoryId};
use thiserror::Error;

/// Errors that can occur during pull request operations.
#[derive(Debug, Error)]
pub enum CollaborationError {
    /// Repository not found.
    #[error("repository not found: {0}")]
    RepoNotFound(RepositoryId),

    /// Pull request not found.
    #[error("pull request not found: {repo_id}#{number}")]
    PullRequestNotFound { repo_id: RepositoryId, number: u32 },

    /// A pull request with this number already exists.
    #[error("pull request already exists: {repo_id}#{number}")]
    PullRequestExists { repo_id: RepositoryId, number: u32 },

    /// Pull request already merged.
    #[error("pull request already merged: {repo_id}#{number}")]
    AlreadyMerged { repo_id: RepositoryId, number: u32 },

    /// Pull request is closed.
    #[error("pull request is closed: {repo_id}#{number}")]
    AlreadyClosed { repo_id: RepositoryId, number: u32 },

    /// The pull request changed between read and write.
    #[error("pull request was modified concurrently: {repo_id}#{number}")]
    ModifiedConcurrently { repo_id: RepositoryId, number: u32 },

    /// Source and target branch are the same.
    #[error("source and target branch are both '{0}'")]
    SameBranch(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// No free number could be allocated.
    #[error("could not allocate a pull request number for {repo_id} after {attempts} attempts")]
    NumberExhausted { repo_id: RepositoryId, attempts: usize },

    /// The pull request store failed.
    #[error("persistence error: {0}")]
    Backend(String),

    /// Authorization failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The repository store failed.
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CollaborationError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollaborationError::RepoNotFound(_) | CollaborationError::PullRequestNotFound { .. } => {
                ErrorKind::NotFound
            }
            CollaborationError::PullRequestExists { .. } => ErrorKind::AlreadyExists,
            CollaborationError::AlreadyMerged { .. }
            | CollaborationError::AlreadyClosed { .. }
            | CollaborationError::ModifiedConcurrently { .. } => ErrorKind::Conflict,
            CollaborationError::SameBranch(_) | CollaborationError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            CollaborationError::NumberExhausted { .. } | CollaborationError::Backend(_) => {
                ErrorKind::Unavailable
            }
            CollaborationError::Auth(e) => e.kind(),
            CollaborationError::Repo(e) => e.kind(),
        }
    }
}

/// Result type for pull request operations.
pub type Result<T> = std::result::Result<T, CollaborationError>;
