//! Repository types for Depot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{RepositoryId, Timestamp, UserId};

/// Visibility of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by anyone, including anonymous callers.
    #[default]
    Public,
    /// Readable only by the owner and collaborators.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("invalid visibility: {other}")),
        }
    }
}

/// Kind of content a repository holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// Source code.
    #[default]
    Code,
    /// Workflow definitions.
    Workflow,
    /// Project assets.
    Project,
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoType::Code => write!(f, "code"),
            RepoType::Workflow => write!(f, "workflow"),
            RepoType::Project => write!(f, "project"),
        }
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(RepoType::Code),
            "workflow" => Ok(RepoType::Workflow),
            "project" => Ok(RepoType::Project),
            other => Err(format!("invalid repository type: {other}")),
        }
    }
}

/// A repository hosted by Depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique identifier.
    pub id: RepositoryId,
    /// Owning user.
    pub owner: UserId,
    /// Human-readable name.
    pub name: String,
    /// URL-safe name, unique per owner.
    pub slug: String,
    /// Kind of repository.
    pub repo_type: RepoType,
    /// Repository visibility.
    pub visibility: Visibility,
    /// Free-form description.
    pub description: String,
    /// Default branch name.
    pub default_branch: String,
    /// Size of Git data in bytes.
    pub size_bytes: u64,
    /// Size of LFS objects linked to this repository in bytes.
    pub lfs_size_bytes: u64,
    /// Whether the LFS endpoints accept requests for this repository.
    pub lfs_enabled: bool,
    /// Location of the bare repository inside repository storage.
    pub storage_path: String,
    /// Star counter.
    pub stars: u64,
    /// Fork counter.
    pub forks: u64,
    /// Repository this one was forked from.
    pub forked_from: Option<RepositoryId>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last metadata update.
    pub updated_at: Timestamp,
    /// Last push received.
    pub pushed_at: Option<Timestamp>,
}

impl Repository {
    /// Returns true if anyone may read the repository.
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Returns true if `user` owns the repository.
    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// Returns the full name (owner/slug).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }

    /// Git plus LFS bytes.
    pub fn total_size(&self) -> u64 {
        self.size_bytes.saturating_add(self.lfs_size_bytes)
    }
}
