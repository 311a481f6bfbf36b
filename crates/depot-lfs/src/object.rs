//! LFS object records.

use depot_storage::Oid;
use depot_types::{RepositoryId, Timestamp};
use serde::{Deserialize, Serialize};

/// Content type recorded when the client gives none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored LFS object. One record exists per oid, however many
/// repositories link it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfsObject {
    pub oid: Oid,
    pub size: u64,
    /// Key of the object in the blob store.
    pub storage_key: String,
    pub content_type: String,
    pub created_at: Timestamp,
}

impl LfsObject {
    /// Creates a record with the default content type.
    pub fn new(oid: Oid, size: u64, storage_key: impl Into<String>) -> Self {
        Self {
            oid,
            size,
            storage_key: storage_key.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            created_at: Timestamp::now(),
        }
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Link between a repository and an object it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfsRepoObject {
    pub repo_id: RepositoryId,
    pub oid: Oid,
    pub created_at: Timestamp,
}

impl LfsRepoObject {
    pub fn new(repo_id: RepositoryId, oid: Oid) -> Self {
        Self {
            repo_id,
            oid,
            created_at: Timestamp::now(),
        }
    }
}
