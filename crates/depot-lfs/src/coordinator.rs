//! Batch processing, verification and object bookkeeping.

use depot_auth::{AccessControl, Permission};
use depot_repo::RepositoryStore;
use depot_storage::{BlobStore, Oid, PresignedUrl};
use depot_types::{Repository, RepositoryId, Timestamp, UserId};
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{
    Action, BatchRequest, BatchResponse, ObjectActions, ObjectResponse, ObjectSpec, Operation,
};
use crate::{LfsError, LfsObject, LfsObjectStore, Result};

/// The only transfer adapter offered.
const BASIC_TRANSFER: &str = "basic";

/// LFS limits and URL settings.
#[derive(Debug, Clone)]
pub struct LfsOptions {
    /// Largest object accepted, in bytes.
    pub max_object_size: u64,
    /// Lifetime of presigned transfer URLs.
    pub url_expiry: Duration,
    /// Externally reachable base URL of the API, used for verify actions.
    pub public_url: String,
}

impl Default for LfsOptions {
    fn default() -> Self {
        Self {
            max_object_size: 5 * 1024 * 1024 * 1024,
            url_expiry: Duration::from_secs(3600),
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Returns true if `oid` is a 64 character lowercase hex SHA-256.
pub fn is_valid_oid(oid: &str) -> bool {
    oid.len() == 64 && oid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn parse_oid(oid: &str) -> Result<Oid> {
    if !is_valid_oid(oid) {
        return Err(LfsError::InvalidOid(oid.to_string()));
    }
    Oid::from_hex(oid).map_err(|_| LfsError::InvalidOid(oid.to_string()))
}

/// Coordinates the batch API with the blob store and object records.
pub struct ObjectCoordinator {
    repos: Arc<dyn RepositoryStore>,
    objects: Arc<dyn LfsObjectStore>,
    blobs: Arc<dyn BlobStore>,
    access: Arc<dyn AccessControl>,
    options: LfsOptions,
}

impl ObjectCoordinator {
    /// Creates a coordinator.
    pub fn new(
        repos: Arc<dyn RepositoryStore>,
        objects: Arc<dyn LfsObjectStore>,
        blobs: Arc<dyn BlobStore>,
        access: Arc<dyn AccessControl>,
        options: LfsOptions,
    ) -> Self {
        Self {
            repos,
            objects,
            blobs,
            access,
            options,
        }
    }

    /// Returns the configured options.
    pub fn options(&self) -> &LfsOptions {
        &self.options
    }

    async fn lfs_repo(&self, repo_id: &RepositoryId) -> Result<Repository> {
        let repo = self
            .repos
            .get(repo_id)
            .await?
            .ok_or(LfsError::RepoNotFound(*repo_id))?;
        if !repo.lfs_enabled {
            return Err(LfsError::LfsNotEnabled(*repo_id));
        }
        Ok(repo)
    }

    /// Answers a batch request.
    ///
    /// Access is checked once for the whole batch: read for downloads,
    /// write for uploads. Each object then gets its own outcome, so one bad
    /// entry never fails the others.
    pub async fn process_batch(
        &self,
        repo_id: &RepositoryId,
        caller: Option<&UserId>,
        request: BatchRequest,
    ) -> Result<BatchResponse> {
        let repo = self.lfs_repo(repo_id).await?;
        let required = match request.operation {
            Operation::Download => Permission::Read,
            Operation::Upload => Permission::Write,
        };
        self.access.check_access(&repo, caller, required).await?;

        tracing::debug!(
            repo = %repo.id,
            operation = ?request.operation,
            objects = request.objects.len(),
            "processing LFS batch"
        );

        let mut objects = Vec::with_capacity(request.objects.len());
        for spec in &request.objects {
            objects.push(self.process_object(&repo, request.operation, spec).await);
        }

        Ok(BatchResponse {
            transfer: BASIC_TRANSFER.to_string(),
            objects,
        })
    }

    async fn process_object(&self, repo: &Repository, operation: Operation, spec: &ObjectSpec) -> ObjectResponse {
        let oid = match parse_oid(&spec.oid) {
            Ok(oid) => oid,
            Err(_) => return ObjectResponse::failed(spec, 422, "invalid object id"),
        };
        if spec.size > self.options.max_object_size {
            return ObjectResponse::failed(
                spec,
                422,
                format!(
                    "object size {} exceeds maximum allowed size of {} bytes",
                    spec.size, self.options.max_object_size
                ),
            );
        }

        let outcome = match operation {
            Operation::Download => self.download_object(spec, &oid).await,
            Operation::Upload => self.upload_object(repo, spec, &oid).await,
        };
        outcome.unwrap_or_else(|e| {
            tracing::warn!(repo = %repo.id, oid = %spec.oid, error = %e, "LFS batch object failed");
            ObjectResponse::failed(spec, 500, e.to_string())
        })
    }

    async fn download_object(&self, spec: &ObjectSpec, oid: &Oid) -> Result<ObjectResponse> {
        if !self.blobs.exists(oid).await? {
            return Ok(ObjectResponse::failed(spec, 404, "object not found"));
        }
        let url = self
            .blobs
            .generate_download_url(oid, self.options.url_expiry)
            .await?;
        Ok(ObjectResponse::with_actions(
            spec,
            ObjectActions {
                download: Some(action(url)),
                ..Default::default()
            },
        ))
    }

    async fn upload_object(&self, repo: &Repository, spec: &ObjectSpec, oid: &Oid) -> Result<ObjectResponse> {
        if self.blobs.exists(oid).await? {
            // Content addressed: the bytes are already here, only link them.
            if self.objects.get_object(oid).await?.is_none() {
                let size = self.blobs.size(oid).await?.unwrap_or(spec.size);
                self.create_object(oid, size, self.blobs.storage_key(oid), None)
                    .await?;
            }
            self.link_object(&repo.id, oid).await?;
            return Ok(ObjectResponse::present(spec));
        }

        let url = self
            .blobs
            .generate_upload_url(oid, spec.size, self.options.url_expiry)
            .await?;
        let expires_in = Timestamp::now().secs_until(url.expires_at);
        let verify = Action {
            href: format!(
                "{}/api/repos/{}/lfs/verify",
                self.options.public_url.trim_end_matches('/'),
                repo.id
            ),
            header: None,
            expires_in,
        };
        Ok(ObjectResponse::with_actions(
            spec,
            ObjectActions {
                upload: Some(action(url)),
                verify: Some(verify),
                ..Default::default()
            },
        ))
    }

    /// Records an object unless a record for its oid exists, returning the
    /// stored record.
    pub async fn create_object(
        &self,
        oid: &Oid,
        size: u64,
        storage_key: impl Into<String>,
        content_type: Option<&str>,
    ) -> Result<LfsObject> {
        let mut object = LfsObject::new(*oid, size, storage_key);
        if let Some(content_type) = content_type {
            object = object.with_content_type(content_type);
        }
        self.objects.insert_object(object).await
    }

    /// Links an object to a repository. Linking twice is a no-op.
    pub async fn link_object(&self, repo_id: &RepositoryId, oid: &Oid) -> Result<()> {
        if self.objects.link(repo_id, oid).await? {
            tracing::debug!(repo = %repo_id, %oid, "linked LFS object");
        }
        Ok(())
    }

    /// Confirms an upload landed with the asserted size, then records and
    /// links the object. The caller needs write access.
    pub async fn verify_object(
        &self,
        repo_id: &RepositoryId,
        caller: Option<&UserId>,
        oid: &str,
        size: u64,
    ) -> Result<LfsObject> {
        let repo = self.lfs_repo(repo_id).await?;
        self.access
            .check_access(&repo, caller, Permission::Write)
            .await?;

        let oid = parse_oid(oid)?;
        let actual = self
            .blobs
            .size(&oid)
            .await?
            .ok_or_else(|| LfsError::ObjectNotFound(oid.to_hex()))?;
        if actual != size {
            return Err(LfsError::SizeMismatch {
                expected: size,
                actual,
            });
        }

        let object = self
            .create_object(&oid, actual, self.blobs.storage_key(&oid), None)
            .await?;
        self.link_object(&repo.id, &oid).await?;

        tracing::info!(repo = %repo.id, %oid, size = actual, "LFS object verified");
        Ok(object)
    }

    /// Lists the objects a repository links. The caller needs read access.
    pub async fn list_repo_objects(&self, repo_id: &RepositoryId, caller: Option<&UserId>) -> Result<Vec<LfsObject>> {
        let repo = self
            .repos
            .get(repo_id)
            .await?
            .ok_or(LfsError::RepoNotFound(*repo_id))?;
        self.access
            .check_access(&repo, caller, Permission::Read)
            .await?;
        self.objects.list_for_repo(&repo.id).await
    }
}

fn action(url: PresignedUrl) -> Action {
    let expires_in = Timestamp::now().secs_until(url.expires_at);
    Action {
        href: url.url,
        header: (!url.headers.is_empty()).then_some(url.headers),
        expires_in,
    }
}
