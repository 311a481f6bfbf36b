//! Storage quota port.

use async_trait::async_trait;
use depot_types::UserId;
use std::sync::Arc;

use crate::{RepositoryStore, Result};

/// Reports how much storage an owner may use and has used.
///
/// A quota of zero or less means unlimited.
#[async_trait]
pub trait QuotaProvider: Send + Sync {
    /// Allowed bytes for `owner`.
    async fn storage_quota(&self, owner: &UserId) -> Result<i64>;

    /// Bytes currently used by `owner`.
    async fn storage_used(&self, owner: &UserId) -> Result<u64>;
}

/// The same quota for every owner, with usage summed from the repository
/// store.
pub struct FixedQuota {
    quota: i64,
    repos: Arc<dyn RepositoryStore>,
}

impl FixedQuota {
    /// Creates a provider granting `quota` bytes to each owner.
    pub fn new(quota: i64, repos: Arc<dyn RepositoryStore>) -> Self {
        Self { quota, repos }
    }
}

#[async_trait]
impl QuotaProvider for FixedQuota {
    async fn storage_quota(&self, _owner: &UserId) -> Result<i64> {
        Ok(self.quota)
    }

    async fn storage_used(&self, owner: &UserId) -> Result<u64> {
        self.repos.owner_usage(owner).await
    }
}
