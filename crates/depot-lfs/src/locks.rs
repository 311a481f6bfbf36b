//! File locking.

use depot_auth::{AccessControl, Permission};
use depot_repo::RepositoryStore;
use depot_types::{LockId, Repository, RepositoryId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{LfsError, LfsLock, LockStore, Result};

/// Narrows a lock listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockFilter {
    /// Only the lock on this path.
    #[serde(default)]
    pub path: Option<String>,
    /// Only the lock with this id.
    #[serde(default)]
    pub id: Option<LockId>,
    /// At most this many locks.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// A repository's locks split by holder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockVerification {
    /// Locks the caller holds.
    pub ours: Vec<LfsLock>,
    /// Locks held by anyone else.
    pub theirs: Vec<LfsLock>,
}

/// Creates, releases and lists file locks.
pub struct LockManager {
    repos: Arc<dyn RepositoryStore>,
    locks: Arc<dyn LockStore>,
    access: Arc<dyn AccessControl>,
}

impl LockManager {
    /// Creates a lock manager.
    pub fn new(
        repos: Arc<dyn RepositoryStore>,
        locks: Arc<dyn LockStore>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            repos,
            locks,
            access,
        }
    }

    async fn repo(&self, repo_id: &RepositoryId) -> Result<Repository> {
        self.repos
            .get(repo_id)
            .await?
            .ok_or(LfsError::RepoNotFound(*repo_id))
    }

    /// Locks `path` for `caller`. The caller needs write access.
    ///
    /// # Errors
    ///
    /// [`LfsError::LockAlreadyExists`] with the current holder if any lock
    /// exists on the path, whoever owns it.
    pub async fn create_lock(&self, repo_id: &RepositoryId, caller: &UserId, path: &str) -> Result<LfsLock> {
        let repo = self.repo(repo_id).await?;
        if !repo.lfs_enabled {
            return Err(LfsError::LfsNotEnabled(*repo_id));
        }
        self.access
            .check_access(&repo, Some(caller), Permission::Write)
            .await?;

        let path = path.trim();
        if path.is_empty() {
            return Err(LfsError::Validation("lock path must not be empty".into()));
        }

        let lock = LfsLock::new(repo.id, path, caller.clone());
        self.locks.insert(lock.clone()).await?;

        tracing::info!(repo = %repo.id, lock = %lock.id, path = %lock.path, owner = %caller, "lock created");
        Ok(lock)
    }

    /// Releases a lock.
    ///
    /// Without `force` only the holder may release it. With `force` the
    /// caller needs admin access, and ownership is not checked.
    pub async fn delete_lock(
        &self,
        repo_id: &RepositoryId,
        lock_id: &LockId,
        caller: &UserId,
        force: bool,
    ) -> Result<LfsLock> {
        let repo = self.repo(repo_id).await?;
        let lock = self
            .locks
            .get(lock_id)
            .await?
            .filter(|lock| lock.repo_id == repo.id)
            .ok_or(LfsError::LockNotFound(*lock_id))?;

        let permitted = if force {
            self.access
                .can_access(&repo, Some(caller), Permission::Admin)
                .await?
        } else {
            lock.is_owned_by(caller)
        };
        if !permitted {
            return Err(LfsError::LockNotOwned(*lock_id));
        }

        let removed = self.locks.delete(lock_id).await?;
        tracing::info!(
            repo = %repo.id,
            lock = %removed.id,
            path = %removed.path,
            by = %caller,
            force,
            "lock deleted"
        );
        Ok(removed)
    }

    /// Lists locks oldest first. The caller needs read access.
    pub async fn list_locks(
        &self,
        repo_id: &RepositoryId,
        caller: Option<&UserId>,
        filter: &LockFilter,
    ) -> Result<Vec<LfsLock>> {
        let repo = self.repo(repo_id).await?;
        self.access
            .check_access(&repo, caller, Permission::Read)
            .await?;

        let locks = self.locks.list(&repo.id).await?;
        let matching = locks
            .into_iter()
            .filter(|lock| filter.path.as_deref().map_or(true, |p| lock.path == p))
            .filter(|lock| filter.id.map_or(true, |id| lock.id == id));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    /// Splits the repository's locks into the caller's and everyone
    /// else's. The caller needs write access.
    pub async fn verify_locks(&self, repo_id: &RepositoryId, caller: &UserId) -> Result<LockVerification> {
        let repo = self.repo(repo_id).await?;
        self.access
            .check_access(&repo, Some(caller), Permission::Write)
            .await?;

        let (ours, theirs) = self
            .locks
            .list(&repo.id)
            .await?
            .into_iter()
            .partition(|lock| lock.is_owned_by(caller));
        Ok(LockVerification { ours, theirs })
    }
}
