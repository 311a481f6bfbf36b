//! Pull request types and state management.

use depot_types::{PullRequestId, RepositoryId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CollaborationError, Result};

/// Status of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    /// Pull request is open and can be reviewed/merged.
    Open,
    /// Pull request was merged into the target branch.
    Merged,
    /// Pull request was closed without merging.
    Closed,
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullRequestStatus::Open => write!(f, "open"),
            PullRequestStatus::Merged => write!(f, "merged"),
            PullRequestStatus::Closed => write!(f, "closed"),
        }
    }
}

/// A pull request for proposing changes to a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Unique identifier.
    pub id: PullRequestId,
    /// Repository the pull request belongs to.
    pub repo_id: RepositoryId,
    /// Pull request number within the repository (#1, #2, etc.).
    pub number: u32,
    /// Title of the pull request.
    pub title: String,
    /// Description/body of the pull request (Markdown).
    pub description: String,
    /// Source branch name.
    pub source_branch: String,
    /// Target branch name.
    pub target_branch: String,
    /// Current status.
    pub status: PullRequestStatus,
    /// Who opened the pull request.
    pub author: UserId,
    /// Who merged the pull request (if merged).
    pub merged_by: Option<UserId>,
    /// When the pull request was merged (if merged).
    pub merged_at: Option<Timestamp>,
    /// When the pull request was last closed (cleared on reopen).
    pub closed_at: Option<Timestamp>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    pub updated_at: Timestamp,
}

impl PullRequest {
    /// Creates a new open pull request.
    pub fn new(
        repo_id: RepositoryId,
        number: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        author: UserId,
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PullRequestId::generate(),
            repo_id,
            number,
            title: title.into(),
            description: description.into(),
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            status: PullRequestStatus::Open,
            author,
            merged_by: None,
            merged_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the pull request is open.
    pub fn is_open(&self) -> bool {
        self.status == PullRequestStatus::Open
    }

    /// Returns true if the pull request is merged.
    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }

    /// Returns true if the pull request is closed (not merged).
    pub fn is_closed(&self) -> bool {
        self.status == PullRequestStatus::Closed
    }

    fn already_merged(&self) -> CollaborationError {
        CollaborationError::AlreadyMerged {
            repo_id: self.repo_id,
            number: self.number,
        }
    }

    /// Fails if the pull request can no longer change.
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.is_merged() {
            return Err(self.already_merged());
        }
        Ok(())
    }

    /// Closes the pull request without merging. Closing a closed pull
    /// request keeps its original `closed_at`.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        if !self.is_closed() {
            let now = Timestamp::now();
            self.status = PullRequestStatus::Closed;
            self.closed_at = Some(now);
            self.updated_at = now;
        }
        Ok(())
    }

    /// Reopens a closed pull request. Reopening an open one is a no-op.
    pub fn reopen(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        if self.is_closed() {
            self.status = PullRequestStatus::Open;
            self.closed_at = None;
            self.updated_at = Timestamp::now();
        }
        Ok(())
    }

    /// Records the pull request as merged by `merged_by`.
    pub fn merge(&mut self, merged_by: UserId) -> Result<()> {
        match self.status {
            PullRequestStatus::Merged => Err(self.already_merged()),
            PullRequestStatus::Closed => Err(CollaborationError::AlreadyClosed {
                repo_id: self.repo_id,
                number: self.number,
            }),
            PullRequestStatus::Open => {
                let now = Timestamp::now();
                self.status = PullRequestStatus::Merged;
                self.merged_by = Some(merged_by);
                self.merged_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// Updates the title.
    pub fn update_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Timestamp::now();
    }

    /// Updates the description.
    pub fn update_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.updated_at = Timestamp::now();
    }
}
