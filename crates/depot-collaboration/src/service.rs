//! Pull request workflow.

use depot_auth::{AccessControl, Permission};
use depot_repo::RepositoryStore;
use depot_types::{Repository, RepositoryId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{CollaborationError, PullRequest, PullRequestStatus, PullRequestStore, Result};

/// How many numbers `create` tries before giving up.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

/// How many times a write that lost a race is re-applied to a fresh read.
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Request to open a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPullRequest {
    /// Title, must not be blank.
    pub title: String,
    /// Description (Markdown).
    #[serde(default)]
    pub description: String,
    /// Branch with the proposed changes.
    pub source_branch: String,
    /// Branch to merge into.
    pub target_branch: String,
}

/// Fields to change on a pull request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequestUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// `closed` to close, `open` to reopen.
    #[serde(default)]
    pub status: Option<PullRequestStatus>,
}

/// Opens, reads, updates and merges pull requests.
pub struct PullRequestService {
    repos: Arc<dyn RepositoryStore>,
    pulls: Arc<dyn PullRequestStore>,
    access: Arc<dyn AccessControl>,
}

impl PullRequestService {
    /// Creates the service.
    pub fn new(
        repos: Arc<dyn RepositoryStore>,
        pulls: Arc<dyn PullRequestStore>,
        access: Arc<dyn AccessControl>,
    ) -> Self {
        Self {
            repos,
            pulls,
            access,
        }
    }

    async fn repo(&self, repo_id: &RepositoryId) -> Result<Repository> {
        self.repos
            .get(repo_id)
            .await?
            .ok_or(CollaborationError::RepoNotFound(*repo_id))
    }

    async fn load(&self, repo_id: &RepositoryId, number: u32) -> Result<PullRequest> {
        self.pulls
            .get(repo_id, number)
            .await?
            .ok_or(CollaborationError::PullRequestNotFound {
                repo_id: *repo_id,
                number,
            })
    }

    /// Applies `change` to the stored pull request and writes it back,
    /// re-reading and re-applying when another writer got there first.
    async fn modify<F>(&self, repo_id: &RepositoryId, number: u32, mut change: F) -> Result<PullRequest>
    where
        F: FnMut(&mut PullRequest) -> Result<()>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let current = self.load(repo_id, number).await?;
            let mut updated = current.clone();
            change(&mut updated)?;

            match self.pulls.update(&current, updated.clone()).await {
                Ok(()) => return Ok(updated),
                Err(CollaborationError::ModifiedConcurrently { .. }) => {
                    tracing::debug!(repo = %repo_id, number, attempt, "pull request changed underneath, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CollaborationError::ModifiedConcurrently {
            repo_id: *repo_id,
            number,
        })
    }

    /// Opens a pull request. The caller needs read access.
    pub async fn create(&self, repo_id: &RepositoryId, caller: &UserId, new: NewPullRequest) -> Result<PullRequest> {
        let repo = self.repo(repo_id).await?;
        self.access
            .check_access(&repo, Some(caller), Permission::Read)
            .await?;

        let title = new.title.trim();
        if title.is_empty() {
            return Err(CollaborationError::Validation("title must not be empty".into()));
        }
        if new.source_branch.is_empty() || new.target_branch.is_empty() {
            return Err(CollaborationError::Validation(
                "source and target branch are required".into(),
            ));
        }
        if new.source_branch == new.target_branch {
            return Err(CollaborationError::SameBranch(new.source_branch));
        }

        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let number = self.pulls.next_number(&repo.id).await?;
            let pr = PullRequest::new(
                repo.id,
                number,
                title,
                new.description.clone(),
                caller.clone(),
                new.source_branch.clone(),
                new.target_branch.clone(),
            );

            match self.pulls.insert(pr.clone()).await {
                Ok(()) => {
                    tracing::info!(repo = %repo.id, number, author = %caller, "pull request opened");
                    return Ok(pr);
                }
                Err(CollaborationError::PullRequestExists { .. }) => {
                    tracing::warn!(repo = %repo.id, number, attempt, "pull request number taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CollaborationError::NumberExhausted {
            repo_id: repo.id,
            attempts: MAX_NUMBER_ATTEMPTS,
        })
    }

    /// Gets a pull request. The caller needs read access.
    pub async fn get(&self, repo_id: &RepositoryId, number: u32, caller: Option<&UserId>) -> Result<PullRequest> {
        let repo = self.repo(repo_id).await?;
        self.access.check_access(&repo, caller, Permission::Read).await?;
        self.load(&repo.id, number).await
    }

    /// Lists pull requests, newest number first. The caller needs read
    /// access.
    pub async fn list(
        &self,
        repo_id: &RepositoryId,
        status: Option<PullRequestStatus>,
        caller: Option<&UserId>,
    ) -> Result<Vec<PullRequest>> {
        let repo = self.repo(repo_id).await?;
        self.access.check_access(&repo, caller, Permission::Read).await?;

        let mut prs = self.pulls.list(&repo.id, status).await?;
        prs.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(prs)
    }

    /// Updates title, description or status. Allowed for the author and for
    /// callers with write access.
    pub async fn update(
        &self,
        repo_id: &RepositoryId,
        number: u32,
        caller: &UserId,
        update: PullRequestUpdate,
    ) -> Result<PullRequest> {
        let repo = self.repo(repo_id).await?;
        let pr = self.load(&repo.id, number).await?;

        if &pr.author != caller {
            self.access
                .check_access(&repo, Some(caller), Permission::Write)
                .await?;
        }
        pr.ensure_mutable()?;

        let title = match &update.title {
            Some(title) if title.trim().is_empty() => {
                return Err(CollaborationError::Validation("title must not be empty".into()));
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };
        if update.status == Some(PullRequestStatus::Merged) {
            return Err(CollaborationError::Validation(
                "use merge to merge a pull request".into(),
            ));
        }

        let pr = self
            .modify(&repo.id, number, |pr| {
                pr.ensure_mutable()?;
                match update.status {
                    Some(PullRequestStatus::Closed) => pr.close()?,
                    Some(PullRequestStatus::Open) => pr.reopen()?,
                    Some(PullRequestStatus::Merged) | None => {}
                }
                if let Some(title) = &title {
                    pr.update_title(title.as_str());
                }
                if let Some(description) = &update.description {
                    pr.update_description(description.as_str());
                }
                Ok(())
            })
            .await?;

        tracing::info!(repo = %repo.id, number, status = %pr.status, by = %caller, "pull request updated");
        Ok(pr)
    }

    /// Records a merge. The caller needs write access.
    pub async fn merge(&self, repo_id: &RepositoryId, number: u32, caller: &UserId) -> Result<PullRequest> {
        let repo = self.repo(repo_id).await?;
        self.access
            .check_access(&repo, Some(caller), Permission::Write)
            .await?;

        let pr = self
            .modify(&repo.id, number, |pr| pr.merge(caller.clone()))
            .await?;

        tracing::info!(repo = %repo.id, number, merged_by = %caller, "pull request merged");
        Ok(pr)
    }
}
