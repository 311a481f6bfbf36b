//! Common types used throughout `depot`.
//!
//! This crate provides the identifiers, timestamps and the repository
//! entity shared by the Depot service crates, plus the error taxonomy every
//! crate classifies its errors into.

mod error;
mod id;
mod pagination;
mod repository;
mod timestamp;

pub use error::ErrorKind;
pub use id::{LockId, PullRequestId, RepositoryId, UserId};
pub use pagination::{Page, Pagination, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use repository::{RepoType, Repository, Visibility};
pub use timestamp::Timestamp;

/// Default branch used when a repository is created without one.
pub const DEFAULT_BRANCH: &str = "main";
