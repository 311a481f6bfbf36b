//! Repository persistence port.

use async_trait::async_trait;
use depot_types::{Page, Pagination, RepoType, Repository, RepositoryId, Timestamp, UserId, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::Result;

/// Listing filter. Every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFilter {
    /// Only repositories owned by this user.
    #[serde(default)]
    pub owner: Option<UserId>,
    /// Only repositories of this type.
    #[serde(default, rename = "type")]
    pub repo_type: Option<RepoType>,
    /// Only repositories with this visibility.
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Case-insensitive substring of the name or description.
    #[serde(default)]
    pub search: Option<String>,
}

impl RepositoryFilter {
    /// Returns true if `repo` passes every present criterion.
    pub fn matches(&self, repo: &Repository) -> bool {
        if self.owner.as_ref().is_some_and(|o| o != &repo.owner) {
            return false;
        }
        if self.repo_type.is_some_and(|t| t != repo.repo_type) {
            return false;
        }
        if self.visibility.is_some_and(|v| v != repo.visibility) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                repo.name.to_lowercase().contains(&term)
                    || repo.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepositoryOrder {
    /// Most recently updated first.
    #[default]
    RecentlyUpdated,
    /// Most stars first, then newest.
    Popular,
}

/// Who is looking at a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    /// Sees public repositories only.
    #[default]
    Anonymous,
    /// Sees public repositories, their own, and the ones shared with them.
    User {
        /// The viewing user.
        id: UserId,
        /// Repositories the user holds a collaborator grant on.
        shared: HashSet<RepositoryId>,
    },
}

impl Viewer {
    /// Returns true if the viewer may read `repo`.
    pub fn can_see(&self, repo: &Repository) -> bool {
        if repo.is_public() {
            return true;
        }
        match self {
            Viewer::Anonymous => false,
            Viewer::User { id, shared } => repo.is_owner(id) || shared.contains(&repo.id),
        }
    }
}

/// A complete listing request.
#[derive(Debug, Clone, Default)]
pub struct RepositoryQuery {
    /// Filter criteria.
    pub filter: RepositoryFilter,
    /// Result order.
    pub order: RepositoryOrder,
    /// Page to return.
    pub pagination: Pagination,
    /// Visibility scope.
    pub viewer: Viewer,
}

/// Persistence port for repositories.
///
/// `(owner, slug)` is a unique key: implementations must reject a second
/// repository with the same pair atomically, for both inserts and renames.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Inserts a repository if its `(owner, slug)` is free.
    async fn insert(&self, repo: Repository) -> Result<()>;

    /// Gets a repository by id.
    async fn get(&self, id: &RepositoryId) -> Result<Option<Repository>>;

    /// Gets a repository by owner and slug.
    async fn get_by_slug(&self, owner: &UserId, slug: &str) -> Result<Option<Repository>>;

    /// Lists repositories matching a query.
    async fn list(&self, query: &RepositoryQuery) -> Result<Page<Repository>>;

    /// Replaces a stored repository, keeping the slug index consistent.
    async fn update(&self, repo: Repository) -> Result<()>;

    /// Deletes a repository.
    async fn delete(&self, id: &RepositoryId) -> Result<()>;

    /// Records the time of the latest push.
    async fn set_pushed_at(&self, id: &RepositoryId, at: Timestamp) -> Result<()>;

    /// Records the Git and LFS byte sizes.
    async fn set_size(&self, id: &RepositoryId, size_bytes: u64, lfs_size_bytes: u64) -> Result<()>;

    /// Total bytes (Git plus LFS) across an owner's repositories.
    async fn owner_usage(&self, owner: &UserId) -> Result<u64>;
}
