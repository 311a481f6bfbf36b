//! Collaborator persistence.

use async_trait::async_trait;
use depot_types::{RepositoryId, Timestamp, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{AuthError, Collaborator, Permission, Result};

/// Persistence port for collaborator grants, keyed by `(repository, user)`.
#[async_trait]
pub trait CollaboratorStore: Send + Sync {
    /// Looks up the grant for `user` on `repo`.
    async fn get(&self, repo: &RepositoryId, user: &UserId) -> Result<Option<Collaborator>>;

    /// Lists grants on a repository, oldest first.
    async fn list(&self, repo: &RepositoryId) -> Result<Vec<Collaborator>>;

    /// Lists every grant held by a user.
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Collaborator>>;

    /// Stores a new grant. Fails with [`AuthError::AlreadyExists`] if the
    /// user already has one on the repository.
    async fn insert(&self, collaborator: Collaborator) -> Result<()>;

    /// Changes the permission of an existing grant.
    async fn update(&self, repo: &RepositoryId, user: &UserId, permission: Permission) -> Result<Collaborator>;

    /// Removes a grant. Fails with [`AuthError::NotFound`] if absent.
    async fn remove(&self, repo: &RepositoryId, user: &UserId) -> Result<()>;

    /// Removes every grant on a repository, returning how many were removed.
    async fn remove_all(&self, repo: &RepositoryId) -> Result<usize>;
}

/// Thread-safe in-memory collaborator store.
#[derive(Debug, Default)]
pub struct MemoryCollaboratorStore {
    /// Grants by (repository, user), each tagged with an insertion sequence
    /// so listings stay stable when creation times collide.
    collaborators: RwLock<HashMap<(RepositoryId, UserId), (u64, Collaborator)>>,
    next_seq: AtomicU64,
}

impl MemoryCollaboratorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut rows: Vec<(u64, Collaborator)>) -> Vec<Collaborator> {
    rows.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then(a.0.cmp(&b.0)));
    rows.into_iter().map(|(_, c)| c).collect()
}

#[async_trait]
impl CollaboratorStore for MemoryCollaboratorStore {
    async fn get(&self, repo: &RepositoryId, user: &UserId) -> Result<Option<Collaborator>> {
        let key = (*repo, user.clone());
        Ok(self.collaborators.read().get(&key).map(|(_, c)| c.clone()))
    }

    async fn list(&self, repo: &RepositoryId) -> Result<Vec<Collaborator>> {
        let rows = self
            .collaborators
            .read()
            .values()
            .filter(|(_, c)| &c.repo_id == repo)
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Collaborator>> {
        let rows = self
            .collaborators
            .read()
            .values()
            .filter(|(_, c)| &c.user == user)
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn insert(&self, collaborator: Collaborator) -> Result<()> {
        let key = (collaborator.repo_id, collaborator.user.clone());
        let mut collabs = self.collaborators.write();

        if collabs.contains_key(&key) {
            return Err(AuthError::AlreadyExists(format!(
                "collaborator '{}' on repository {}",
                collaborator.user, collaborator.repo_id
            )));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        collabs.insert(key, (seq, collaborator));
        Ok(())
    }

    async fn update(&self, repo: &RepositoryId, user: &UserId, permission: Permission) -> Result<Collaborator> {
        let key = (*repo, user.clone());
        let mut collabs = self.collaborators.write();
        let (_, collab) = collabs.get_mut(&key).ok_or_else(|| {
            AuthError::NotFound(format!("collaborator '{}' on repository {}", user, repo))
        })?;

        collab.permission = permission;
        collab.updated_at = Timestamp::now();
        Ok(collab.clone())
    }

    async fn remove(&self, repo: &RepositoryId, user: &UserId) -> Result<()> {
        let key = (*repo, user.clone());
        if self.collaborators.write().remove(&key).is_none() {
            return Err(AuthError::NotFound(format!(
                "collaborator '{}' on repository {}",
                user, repo
            )));
        }
        Ok(())
    }

    async fn remove_all(&self, repo: &RepositoryId) -> Result<usize> {
        let mut collabs = self.collaborators.write();
        let before = collabs.len();
        collabs.retain(|(r, _), _| r != repo);
        Ok(before - collabs.len())
    }
}
