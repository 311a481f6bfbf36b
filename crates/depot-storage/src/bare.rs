//! Bare repository storage.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::{Result, StorageError};

/// Initial content of a new bare repository.
#[derive(Debug, Clone)]
pub struct BareLayout {
    /// Branch `HEAD` points at.
    pub default_branch: String,
    /// Text written to the `description` file.
    pub description: String,
}

impl BareLayout {
    /// Creates a layout with `HEAD` pointing at `default_branch`.
    pub fn new(default_branch: impl Into<String>) -> Self {
        Self {
            default_branch: default_branch.into(),
            description: String::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Storage for bare Git repositories, addressed by a relative path such as
/// `repos/<owner>/<repo_id>/`.
#[async_trait]
pub trait RepoStorage: Send + Sync {
    /// Creates an empty bare repository at `path`.
    async fn init_bare(&self, path: &str, layout: &BareLayout) -> Result<()>;

    /// Removes the repository at `path`.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Checks whether a repository exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Bare repositories on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsRepoStorage {
    root: PathBuf,
}

impl FsRepoStorage {
    /// Creates a storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative storage path under the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for absolute paths, empty paths
    /// or paths containing `..`.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        if path.trim_matches('/').is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(rel))
    }
}

/// Writes the skeleton of a bare repository into `dir`.
async fn write_layout(dir: &Path, layout: &BareLayout) -> Result<()> {
    for sub in [
        "objects/info",
        "objects/pack",
        "refs/heads",
        "refs/tags",
        "info",
    ] {
        fs::create_dir_all(dir.join(sub)).await?;
    }

    fs::write(
        dir.join("HEAD"),
        format!("ref: refs/heads/{}\n", layout.default_branch),
    )
    .await?;
    fs::write(
        dir.join("config"),
        "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = true\n",
    )
    .await?;
    let description = if layout.description.is_empty() {
        "Unnamed repository; edit this file 'description' to name the repository.".to_string()
    } else {
        layout.description.clone()
    };
    fs::write(dir.join("description"), format!("{}\n", description)).await?;
    fs::write(
        dir.join("info/exclude"),
        "# git ls-files --others --exclude-from=.git/info/exclude\n",
    )
    .await?;
    Ok(())
}

/// Writes the layout, removing `dir` again if any step fails.
async fn populate_or_remove(dir: &Path, layout: &BareLayout) -> Result<()> {
    if let Err(e) = write_layout(dir, layout).await {
        if let Err(cleanup) = fs::remove_dir_all(dir).await {
            tracing::warn!(path = %dir.display(), error = %cleanup, "failed to remove partial repository");
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl RepoStorage for FsRepoStorage {
    async fn init_bare(&self, path: &str, layout: &BareLayout) -> Result<()> {
        let dir = self.resolve(path)?;
        if fs::try_exists(&dir).await? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        populate_or_remove(&dir, layout).await?;

        tracing::debug!(path = %dir.display(), branch = %layout.default_branch, "initialized bare repository");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let dir = self.resolve(path)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let dir = self.resolve(path)?;
        Ok(fs::try_exists(dir.join("HEAD")).await?)
    }
}
