//! In-memory repository store.

use async_trait::async_trait;
use depot_types::{Page, Repository, RepositoryId, Timestamp, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{RepoError, RepositoryOrder, RepositoryQuery, RepositoryStore, Result};

#[derive(Debug, Default)]
struct Tables {
    repos: HashMap<RepositoryId, Repository>,
    slugs: HashMap<(UserId, String), RepositoryId>,
}

/// Thread-safe in-memory repository store.
///
/// Both tables sit behind one lock so the slug check and the insert happen
/// under the same write guard.
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    tables: RwLock<Tables>,
}

impl MemoryRepositoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored repositories.
    pub fn len(&self) -> usize {
        self.tables.read().repos.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.read().repos.is_empty()
    }

    fn with_repo<T>(&self, id: &RepositoryId, f: impl FnOnce(&mut Repository) -> T) -> Result<T> {
        let mut tables = self.tables.write();
        let repo = tables
            .repos
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        Ok(f(repo))
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn insert(&self, repo: Repository) -> Result<()> {
        let mut tables = self.tables.write();
        let key = (repo.owner.clone(), repo.slug.clone());

        if tables.slugs.contains_key(&key) {
            return Err(RepoError::AlreadyExists(repo.full_name()));
        }
        if tables.repos.contains_key(&repo.id) {
            return Err(RepoError::AlreadyExists(repo.id.to_string()));
        }

        tables.slugs.insert(key, repo.id);
        tables.repos.insert(repo.id, repo);
        Ok(())
    }

    async fn get(&self, id: &RepositoryId) -> Result<Option<Repository>> {
        Ok(self.tables.read().repos.get(id).cloned())
    }

    async fn get_by_slug(&self, owner: &UserId, slug: &str) -> Result<Option<Repository>> {
        let tables = self.tables.read();
        let key = (owner.clone(), slug.to_string());
        Ok(tables
            .slugs
            .get(&key)
            .and_then(|id| tables.repos.get(id))
            .cloned())
    }

    async fn list(&self, query: &RepositoryQuery) -> Result<Page<Repository>> {
        let mut items: Vec<Repository> = self
            .tables
            .read()
            .repos
            .values()
            .filter(|r| query.viewer.can_see(r) && query.filter.matches(r))
            .cloned()
            .collect();

        match query.order {
            RepositoryOrder::RecentlyUpdated => items.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
            RepositoryOrder::Popular => items.sort_by(|a, b| {
                b.stars
                    .cmp(&a.stars)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
        }

        Ok(query.pagination.apply(items))
    }

    async fn update(&self, repo: Repository) -> Result<()> {
        let mut tables = self.tables.write();
        let old_key = match tables.repos.get(&repo.id) {
            Some(existing) => (existing.owner.clone(), existing.slug.clone()),
            None => return Err(RepoError::NotFound(repo.id.to_string())),
        };
        let new_key = (repo.owner.clone(), repo.slug.clone());

        if new_key != old_key {
            if tables.slugs.get(&new_key).is_some_and(|id| id != &repo.id) {
                return Err(RepoError::AlreadyExists(repo.full_name()));
            }
            tables.slugs.remove(&old_key);
            tables.slugs.insert(new_key, repo.id);
        }

        tables.repos.insert(repo.id, repo);
        Ok(())
    }

    async fn delete(&self, id: &RepositoryId) -> Result<()> {
        let mut tables = self.tables.write();
        let repo = tables
            .repos
            .remove(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        tables.slugs.remove(&(repo.owner, repo.slug));
        Ok(())
    }

    async fn set_pushed_at(&self, id: &RepositoryId, at: Timestamp) -> Result<()> {
        self.with_repo(id, |repo| repo.pushed_at = Some(at))
    }

    async fn set_size(&self, id: &RepositoryId, size_bytes: u64, lfs_size_bytes: u64) -> Result<()> {
        self.with_repo(id, |repo| {
            repo.size_bytes = size_bytes;
            repo.lfs_size_bytes = lfs_size_bytes;
        })
    }

    async fn owner_usage(&self, owner: &UserId) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .repos
            .values()
            .filter(|r| &r.owner == owner)
            .map(Repository::total_size)
            .fold(0u64, u64::saturating_add))
    }
}
