//! Repository lifecycle.

use depot_auth::{AccessControl, AuthError, CollaboratorStore, Permission};
use depot_storage::{BareLayout, RepoStorage};
use depot_types::{
    Page, Pagination, RepoType, Repository, RepositoryId, Timestamp, UserId, Visibility,
    DEFAULT_BRANCH,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    derive_slug, QuotaProvider, RepoError, RepositoryFilter, RepositoryOrder, RepositoryQuery,
    RepositoryStore, Result, Viewer,
};

/// Settings for [`RepositoryManager`].
#[derive(Debug, Clone)]
pub struct RepoManagerOptions {
    /// Prefix under which repository storage paths are allocated.
    pub repo_prefix: String,
    /// Branch `HEAD` points at in new repositories.
    pub default_branch: String,
}

impl Default for RepoManagerOptions {
    fn default() -> Self {
        Self {
            repo_prefix: "repos".to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Request to create a repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRepository {
    /// Human-readable name; the slug is derived from it.
    pub name: String,
    /// Repository type.
    #[serde(default, rename = "type")]
    pub repo_type: RepoType,
    /// Visibility.
    #[serde(default)]
    pub visibility: Visibility,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Whether the LFS endpoints accept requests.
    #[serde(default)]
    pub lfs_enabled: bool,
}

/// Fields to change on a repository. Absent fields and empty strings leave
/// the current value in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryUpdate {
    /// New name; also regenerates the slug.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New visibility.
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// New default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Enable or disable LFS.
    #[serde(default)]
    pub lfs_enabled: Option<bool>,
}

/// Storage consumed by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Repository the figures belong to.
    pub repo_id: RepositoryId,
    /// Git data in bytes.
    pub size_bytes: u64,
    /// LFS objects in bytes.
    pub lfs_size_bytes: u64,
    /// Sum of both.
    pub total_bytes: u64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates, reads, lists, updates and deletes repositories.
pub struct RepositoryManager {
    repos: Arc<dyn RepositoryStore>,
    storage: Arc<dyn RepoStorage>,
    access: Arc<dyn AccessControl>,
    collaborators: Arc<dyn CollaboratorStore>,
    quota: Option<Arc<dyn QuotaProvider>>,
    options: RepoManagerOptions,
}

impl RepositoryManager {
    /// Creates a manager without a quota check.
    pub fn new(
        repos: Arc<dyn RepositoryStore>,
        storage: Arc<dyn RepoStorage>,
        access: Arc<dyn AccessControl>,
        collaborators: Arc<dyn CollaboratorStore>,
        options: RepoManagerOptions,
    ) -> Self {
        Self {
            repos,
            storage,
            access,
            collaborators,
            quota: None,
            options,
        }
    }

    /// Enables the storage quota check on create.
    pub fn with_quota(mut self, quota: Arc<dyn QuotaProvider>) -> Self {
        self.quota = Some(quota);
        self
    }

    async fn load(&self, id: &RepositoryId) -> Result<Repository> {
        self.repos
            .get(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Fails with [`RepoError::QuotaExceeded`] when the owner is at or over
    /// quota. Lookup failures are logged and let the caller proceed.
    async fn check_quota(&self, owner: &UserId) -> Result<()> {
        let Some(quota) = &self.quota else {
            return Ok(());
        };

        let limit = match quota.storage_quota(owner).await {
            Ok(limit) => limit,
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "quota lookup failed, skipping check");
                return Ok(());
            }
        };
        if limit <= 0 {
            return Ok(());
        }

        let used = match quota.storage_used(owner).await {
            Ok(used) => used,
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "storage usage lookup failed, skipping check");
                return Ok(());
            }
        };
        if used >= limit as u64 {
            return Err(RepoError::QuotaExceeded { used, quota: limit });
        }
        Ok(())
    }

    /// Creates a repository owned by `owner`.
    ///
    /// The bare repository is initialized before the row is persisted; if
    /// persisting fails the storage is removed again.
    pub async fn create(&self, owner: &UserId, new: NewRepository) -> Result<Repository> {
        let slug = derive_slug(&new.name)?;

        if self.repos.get_by_slug(owner, &slug).await?.is_some() {
            return Err(RepoError::AlreadyExists(format!("{}/{}", owner, slug)));
        }

        self.check_quota(owner).await?;

        let id = RepositoryId::generate();
        let storage_path = format!(
            "{}/{}/{}/",
            self.options.repo_prefix.trim_end_matches('/'),
            owner,
            id
        );
        let layout = BareLayout::new(self.options.default_branch.clone())
            .with_description(new.description.clone());
        self.storage.init_bare(&storage_path, &layout).await?;

        let now = Timestamp::now();
        let repo = Repository {
            id,
            owner: owner.clone(),
            name: new.name,
            slug,
            repo_type: new.repo_type,
            visibility: new.visibility,
            description: new.description,
            default_branch: self.options.default_branch.clone(),
            size_bytes: 0,
            lfs_size_bytes: 0,
            lfs_enabled: new.lfs_enabled,
            storage_path,
            stars: 0,
            forks: 0,
            forked_from: None,
            created_at: now,
            updated_at: now,
            pushed_at: None,
        };

        if let Err(e) = self.repos.insert(repo.clone()).await {
            if let Err(cleanup) = self.storage.delete(&repo.storage_path).await {
                tracing::warn!(
                    path = %repo.storage_path,
                    error = %cleanup,
                    "failed to remove storage of unpersisted repository"
                );
            }
            return Err(e);
        }

        tracing::info!(repo = %repo.id, name = %repo.full_name(), visibility = %repo.visibility, "repository created");
        Ok(repo)
    }

    /// Gets a repository the caller can read.
    pub async fn get(&self, id: &RepositoryId, caller: Option<&UserId>) -> Result<Repository> {
        let repo = self.load(id).await?;
        self.access.check_access(&repo, caller, Permission::Read).await?;
        Ok(repo)
    }

    /// Gets a repository by owner and slug.
    pub async fn get_by_slug(&self, owner: &UserId, slug: &str, caller: Option<&UserId>) -> Result<Repository> {
        let repo = self
            .repos
            .get_by_slug(owner, slug)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("{}/{}", owner, slug)))?;
        self.access.check_access(&repo, caller, Permission::Read).await?;
        Ok(repo)
    }

    /// Lists repositories the caller can read, most recently updated first.
    pub async fn list(
        &self,
        filter: RepositoryFilter,
        pagination: Pagination,
        caller: Option<&UserId>,
    ) -> Result<Page<Repository>> {
        let viewer = match caller {
            Some(user) => {
                let shared: HashSet<RepositoryId> = self
                    .collaborators
                    .list_for_user(user)
                    .await?
                    .into_iter()
                    .map(|c| c.repo_id)
                    .collect();
                Viewer::User {
                    id: user.clone(),
                    shared,
                }
            }
            None => Viewer::Anonymous,
        };

        self.repos
            .list(&RepositoryQuery {
                filter,
                order: RepositoryOrder::RecentlyUpdated,
                pagination,
                viewer,
            })
            .await
    }

    /// Lists public repositories, most starred first.
    pub async fn list_public(&self, mut filter: RepositoryFilter, pagination: Pagination) -> Result<Page<Repository>> {
        filter.visibility = Some(Visibility::Public);
        self.repos
            .list(&RepositoryQuery {
                filter,
                order: RepositoryOrder::Popular,
                pagination,
                viewer: Viewer::Anonymous,
            })
            .await
    }

    /// Applies an update. Requires the owner or an admin collaborator.
    pub async fn update(&self, id: &RepositoryId, caller: &UserId, update: RepositoryUpdate) -> Result<Repository> {
        let mut repo = self.load(id).await?;
        self.access
            .check_access(&repo, Some(caller), Permission::Admin)
            .await?;

        if let Some(name) = non_empty(update.name) {
            let slug = derive_slug(&name)?;
            if slug != repo.slug && self.repos.get_by_slug(&repo.owner, &slug).await?.is_some() {
                return Err(RepoError::AlreadyExists(format!("{}/{}", repo.owner, slug)));
            }
            repo.name = name;
            repo.slug = slug;
        }
        if let Some(description) = non_empty(update.description) {
            repo.description = description;
        }
        if let Some(visibility) = update.visibility {
            repo.visibility = visibility;
        }
        if let Some(branch) = non_empty(update.default_branch) {
            repo.default_branch = branch;
        }
        if let Some(lfs_enabled) = update.lfs_enabled {
            repo.lfs_enabled = lfs_enabled;
        }
        repo.updated_at = Timestamp::now();

        self.repos.update(repo.clone()).await?;
        tracing::info!(repo = %repo.id, by = %caller, "repository updated");
        Ok(repo)
    }

    /// Deletes a repository. Owner only.
    ///
    /// Storage removal and collaborator cleanup are best effort; failures
    /// are logged and the row is deleted regardless.
    pub async fn delete(&self, id: &RepositoryId, caller: &UserId) -> Result<()> {
        let repo = self.load(id).await?;
        if !repo.is_owner(caller) {
            return Err(AuthError::NotOwner("delete the repository".to_string()).into());
        }

        if let Err(e) = self.storage.delete(&repo.storage_path).await {
            tracing::warn!(repo = %repo.id, path = %repo.storage_path, error = %e, "failed to delete repository storage");
        }

        self.repos.delete(&repo.id).await?;

        if let Err(e) = self.collaborators.remove_all(&repo.id).await {
            tracing::warn!(repo = %repo.id, error = %e, "failed to delete collaborators");
        }

        tracing::info!(repo = %repo.id, name = %repo.full_name(), "repository deleted");
        Ok(())
    }

    /// Records a push.
    pub async fn update_pushed_at(&self, id: &RepositoryId, at: Timestamp) -> Result<()> {
        self.repos.set_pushed_at(id, at).await
    }

    /// Records the Git and LFS sizes.
    pub async fn update_size(&self, id: &RepositoryId, size_bytes: u64, lfs_size_bytes: u64) -> Result<()> {
        self.repos.set_size(id, size_bytes, lfs_size_bytes).await
    }

    /// Returns the storage consumed by a repository the caller can read.
    pub async fn storage_stats(&self, id: &RepositoryId, caller: Option<&UserId>) -> Result<StorageStats> {
        let repo = self.get(id, caller).await?;
        Ok(StorageStats {
            repo_id: repo.id,
            size_bytes: repo.size_bytes,
            lfs_size_bytes: repo.lfs_size_bytes,
            total_bytes: repo.total_size(),
        })
    }
}
