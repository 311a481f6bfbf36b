//! Collaborator management.

use depot_auth::{AccessControl, AuthError, Collaborator, CollaboratorStore, Permission};
use depot_types::{Repository, RepositoryId, UserId};
use std::sync::Arc;

use crate::{RepoError, RepositoryStore, Result};

/// Adds, changes, removes and lists repository collaborators.
///
/// Only the repository owner may change grants.
pub struct CollaboratorRegistry {
    repos: Arc<dyn RepositoryStore>,
    collaborators: Arc<dyn CollaboratorStore>,
    access: Arc<dyn AccessControl>,
}

impl CollaboratorRegistry {
    /// Creates a registry.
    pub fn new(
        repos: Arc<dyn RepositoryStore>,
        collaborators: Arc<dyn CollaboratorStore>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            repos,
            collaborators,
            access,
        }
    }

    async fn owned_repo(&self, id: &RepositoryId, caller: &UserId, action: &str) -> Result<Repository> {
        let repo = self
            .repos
            .get(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        if !repo.is_owner(caller) {
            return Err(AuthError::NotOwner(action.to_string()).into());
        }
        Ok(repo)
    }

    /// Grants `user` access to a repository.
    pub async fn add(
        &self,
        id: &RepositoryId,
        caller: &UserId,
        user: UserId,
        permission: Permission,
    ) -> Result<Collaborator> {
        let repo = self.owned_repo(id, caller, "add collaborators").await?;
        if repo.is_owner(&user) {
            return Err(RepoError::InvalidInput(
                "the owner cannot be added as a collaborator".to_string(),
            ));
        }

        let collaborator = Collaborator::new(repo.id, user, permission, caller.clone());
        self.collaborators.insert(collaborator.clone()).await?;

        tracing::info!(repo = %repo.id, user = %collaborator.user, %permission, "collaborator added");
        Ok(collaborator)
    }

    /// Changes the permission of an existing collaborator.
    pub async fn update(
        &self,
        id: &RepositoryId,
        caller: &UserId,
        user: &UserId,
        permission: Permission,
    ) -> Result<Collaborator> {
        let repo = self.owned_repo(id, caller, "update collaborators").await?;
        let collaborator = self.collaborators.update(&repo.id, user, permission).await?;

        tracing::info!(repo = %repo.id, user = %user, %permission, "collaborator updated");
        Ok(collaborator)
    }

    /// Revokes a collaborator's access.
    pub async fn remove(&self, id: &RepositoryId, caller: &UserId, user: &UserId) -> Result<()> {
        let repo = self.owned_repo(id, caller, "remove collaborators").await?;
        self.collaborators.remove(&repo.id, user).await?;

        tracing::info!(repo = %repo.id, user = %user, "collaborator removed");
        Ok(())
    }

    /// Lists collaborators, oldest first. Requires read access.
    pub async fn list(&self, id: &RepositoryId, caller: Option<&UserId>) -> Result<Vec<Collaborator>> {
        let repo = self
            .repos
            .get(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        self.access.check_access(&repo, caller, Permission::Read).await?;
        Ok(self.collaborators.list(&repo.id).await?)
    }
}
