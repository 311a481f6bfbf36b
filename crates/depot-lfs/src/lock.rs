//! LFS file locks.

use depot_types::{LockId, RepositoryId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// An exclusive lock on a path within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfsLock {
    pub id: LockId,
    pub repo_id: RepositoryId,
    /// Path relative to the repository root.
    pub path: String,
    pub owner: UserId,
    pub locked_at: Timestamp,
}

impl LfsLock {
    /// Creates a lock held by `owner` from now on.
    pub fn new(repo_id: RepositoryId, path: impl Into<String>, owner: UserId) -> Self {
        Self {
            id: LockId::generate(),
            repo_id,
            path: path.into(),
            owner,
            locked_at: Timestamp::now(),
        }
    }

    /// Returns true if `user` holds the lock.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}
