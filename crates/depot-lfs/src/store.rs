//! LFS persistence ports and their in-memory implementations.

use async_trait::async_trait;
use depot_storage::Oid;
use depot_types::{LockId, RepositoryId};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{LfsError, LfsLock, LfsObject, LfsRepoObject, Result};

/// Persistence port for object records and repository links.
#[async_trait]
pub trait LfsObjectStore: Send + Sync {
    /// Stores `object` unless a record for its oid exists. Returns the
    /// stored record, which is the existing one if there was one.
    async fn insert_object(&self, object: LfsObject) -> Result<LfsObject>;

    /// Gets the record for an oid.
    async fn get_object(&self, oid: &Oid) -> Result<Option<LfsObject>>;

    /// Links an object to a repository. Returns false if already linked.
    async fn link(&self, repo_id: &RepositoryId, oid: &Oid) -> Result<bool>;

    /// Lists the objects linked to a repository, in link order.
    async fn list_for_repo(&self, repo_id: &RepositoryId) -> Result<Vec<LfsObject>>;
}

/// Persistence port for locks. At most one lock exists per
/// `(repository, path)`.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Stores a lock unless its path is taken, in which case fails with
    /// [`LfsError::LockAlreadyExists`] carrying the holder.
    async fn insert(&self, lock: LfsLock) -> Result<()>;

    /// Gets a lock by id.
    async fn get(&self, id: &LockId) -> Result<Option<LfsLock>>;

    /// Lists a repository's locks, oldest first.
    async fn list(&self, repo_id: &RepositoryId) -> Result<Vec<LfsLock>>;

    /// Removes a lock, returning it.
    async fn delete(&self, id: &LockId) -> Result<LfsLock>;
}

#[derive(Default)]
struct ObjectTables {
    objects: HashMap<Oid, LfsObject>,
    links: HashMap<RepositoryId, Vec<LfsRepoObject>>,
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryLfsObjectStore {
    tables: RwLock<ObjectTables>,
}

impl MemoryLfsObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of object records.
    pub fn object_count(&self) -> usize {
        self.tables.read().objects.len()
    }
}

#[async_trait]
impl LfsObjectStore for MemoryLfsObjectStore {
    async fn insert_object(&self, object: LfsObject) -> Result<LfsObject> {
        let mut tables = self.tables.write();
        Ok(tables
            .objects
            .entry(object.oid)
            .or_insert(object)
            .clone())
    }

    async fn get_object(&self, oid: &Oid) -> Result<Option<LfsObject>> {
        Ok(self.tables.read().objects.get(oid).cloned())
    }

    async fn link(&self, repo_id: &RepositoryId, oid: &Oid) -> Result<bool> {
        let mut tables = self.tables.write();
        let links = tables.links.entry(*repo_id).or_default();
        if links.iter().any(|link| &link.oid == oid) {
            return Ok(false);
        }
        links.push(LfsRepoObject::new(*repo_id, *oid));
        Ok(true)
    }

    async fn list_for_repo(&self, repo_id: &RepositoryId) -> Result<Vec<LfsObject>> {
        let tables = self.tables.read();
        Ok(tables
            .links
            .get(repo_id)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|link| tables.objects.get(&link.oid).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct LockTables {
    /// Locks by id, with their insertion sequence.
    locks: HashMap<LockId, (u64, LfsLock)>,
    /// Lock id by (repo_id, path).
    paths: HashMap<(RepositoryId, String), LockId>,
    next_seq: u64,
}

/// In-memory lock store.
#[derive(Default)]
pub struct MemoryLockStore {
    tables: RwLock<LockTables>,
}

impl MemoryLockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn insert(&self, lock: LfsLock) -> Result<()> {
        let mut tables = self.tables.write();
        let key = (lock.repo_id, lock.path.clone());
        if let Some(existing) = tables.paths.get(&key).and_then(|id| tables.locks.get(id)) {
            return Err(LfsError::LockAlreadyExists(Box::new(existing.1.clone())));
        }

        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.paths.insert(key, lock.id);
        tables.locks.insert(lock.id, (seq, lock));
        Ok(())
    }

    async fn get(&self, id: &LockId) -> Result<Option<LfsLock>> {
        Ok(self.tables.read().locks.get(id).map(|(_, lock)| lock.clone()))
    }

    async fn list(&self, repo_id: &RepositoryId) -> Result<Vec<LfsLock>> {
        let tables = self.tables.read();
        let mut locks: Vec<_> = tables
            .locks
            .values()
            .filter(|(_, lock)| &lock.repo_id == repo_id)
            .collect();
        locks.sort_by_key(|(seq, lock)| (lock.locked_at, *seq));
        Ok(locks.into_iter().map(|(_, lock)| lock.clone()).collect())
    }

    async fn delete(&self, id: &LockId) -> Result<LfsLock> {
        let mut tables = self.tables.write();
        let (_, lock) = tables.locks.remove(id).ok_or(LfsError::LockNotFound(*id))?;
        tables.paths.remove(&(lock.repo_id, lock.path.clone()));
        Ok(lock)
    }
}
