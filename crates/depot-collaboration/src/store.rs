//! Pull request persistence.

use async_trait::async_trait;
use depot_types::RepositoryId;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{CollaborationError, PullRequest, PullRequestStatus, Result};

/// Persistence port for pull requests, keyed by `(repository, number)`.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    /// Allocates the next number for a repository. Each call returns a
    /// number no earlier call returned.
    async fn next_number(&self, repo_id: &RepositoryId) -> Result<u32>;

    /// Stores a new pull request. Fails with
    /// [`CollaborationError::PullRequestExists`] if the number is taken.
    async fn insert(&self, pr: PullRequest) -> Result<()>;

    /// Gets a pull request by repository and number.
    async fn get(&self, repo_id: &RepositoryId, number: u32) -> Result<Option<PullRequest>>;

    /// Lists a repository's pull requests, optionally by status.
    async fn list(&self, repo_id: &RepositoryId, status: Option<PullRequestStatus>) -> Result<Vec<PullRequest>>;

    /// Replaces `current` with `updated`, provided the stored record still
    /// equals `current`. Fails with
    /// [`CollaborationError::ModifiedConcurrently`] otherwise.
    async fn update(&self, current: &PullRequest, updated: PullRequest) -> Result<()>;
}

/// In-memory pull request store.
#[derive(Default)]
pub struct MemoryPullRequestStore {
    /// Pull requests indexed by (repo_id, number).
    pull_requests: RwLock<HashMap<(RepositoryId, u32), PullRequest>>,
    /// Counter for next PR number per repository.
    counters: RwLock<HashMap<RepositoryId, u32>>,
}

impl MemoryPullRequestStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PullRequestStore for MemoryPullRequestStore {
    async fn next_number(&self, repo_id: &RepositoryId) -> Result<u32> {
        let mut counters = self.counters.write();
        let counter = counters.entry(*repo_id).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| CollaborationError::Backend(format!("pull request numbers exhausted for {}", repo_id)))?;
        Ok(*counter)
    }

    async fn insert(&self, pr: PullRequest) -> Result<()> {
        let key = (pr.repo_id, pr.number);
        let mut prs = self.pull_requests.write();

        if prs.contains_key(&key) {
            return Err(CollaborationError::PullRequestExists {
                repo_id: pr.repo_id,
                number: pr.number,
            });
        }

        prs.insert(key, pr);
        Ok(())
    }

    async fn get(&self, repo_id: &RepositoryId, number: u32) -> Result<Option<PullRequest>> {
        Ok(self.pull_requests.read().get(&(*repo_id, number)).cloned())
    }

    async fn list(&self, repo_id: &RepositoryId, status: Option<PullRequestStatus>) -> Result<Vec<PullRequest>> {
        Ok(self
            .pull_requests
            .read()
            .values()
            .filter(|pr| &pr.repo_id == repo_id && status.map_or(true, |s| pr.status == s))
            .cloned()
            .collect())
    }

    async fn update(&self, current: &PullRequest, updated: PullRequest) -> Result<()> {
        let key = (current.repo_id, current.number);
        let mut prs = self.pull_requests.write();

        let slot = prs
            .get_mut(&key)
            .ok_or(CollaborationError::PullRequestNotFound {
                repo_id: current.repo_id,
                number: current.number,
            })?;
        if slot != current {
            return Err(CollaborationError::ModifiedConcurrently {
                repo_id: current.repo_id,
                number: current.number,
            });
        }
        *slot = updated;
        Ok(())
    }
}
