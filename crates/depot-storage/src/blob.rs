//! Content-addressed blob storage for LFS objects.

use async_trait::async_trait;
use bytes::Bytes;
use depot_types::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Oid, Result, StorageError, TransferOperation, UrlSigner};

/// A time-limited URL that lets a client transfer an object directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedUrl {
    /// Fully qualified URL, credentials included.
    pub url: String,
    /// HTTP method the client must use.
    pub method: String,
    /// Headers the client must send with the transfer.
    pub headers: HashMap<String, String>,
    /// When the URL stops being accepted.
    pub expires_at: Timestamp,
}

/// A content-addressed object store.
///
/// Objects are keyed by their SHA-256 [`Oid`]; putting the same oid twice is
/// idempotent because identical keys imply identical content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Checks if an object exists.
    async fn exists(&self, oid: &Oid) -> Result<bool>;

    /// Returns the stored size of an object, or `None` if absent.
    async fn size(&self, oid: &Oid) -> Result<Option<u64>>;

    /// Stores an object. Fails if the bytes do not hash to `oid`.
    async fn upload(&self, oid: &Oid, data: Bytes) -> Result<()>;

    /// Reads an object.
    async fn download(&self, oid: &Oid) -> Result<Bytes>;

    /// Deletes an object, returning whether it existed.
    async fn delete(&self, oid: &Oid) -> Result<bool>;

    /// Issues a URL the client can `PUT` the object to.
    async fn generate_upload_url(&self, oid: &Oid, size: u64, expiry: Duration) -> Result<PresignedUrl>;

    /// Issues a URL the client can `GET` the object from.
    async fn generate_download_url(&self, oid: &Oid, expiry: Duration) -> Result<PresignedUrl>;

    /// The backend-specific key the object lives under.
    fn storage_key(&self, oid: &Oid) -> String {
        let hex = oid.to_hex();
        format!("lfs/{}/{}/{}", &hex[..2], &hex[2..4], hex)
    }
}

pub(crate) fn check_content(oid: &Oid, data: &[u8]) -> Result<()> {
    let actual = Oid::compute(data);
    if &actual != oid {
        return Err(StorageError::ContentMismatch {
            oid: oid.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}

/// An in-memory blob store.
pub struct MemoryBlobStore {
    data: RwLock<HashMap<Oid, Bytes>>,
    signer: UrlSigner,
}

impl MemoryBlobStore {
    /// Creates an empty store whose URLs are issued by `signer`.
    #[must_use]
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            signer,
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, oid: &Oid) -> Result<bool> {
        Ok(self.data.read().contains_key(oid))
    }

    async fn size(&self, oid: &Oid) -> Result<Option<u64>> {
        Ok(self.data.read().get(oid).map(|b| b.len() as u64))
    }

    async fn upload(&self, oid: &Oid, data: Bytes) -> Result<()> {
        check_content(oid, &data)?;
        self.data.write().insert(*oid, data);
        Ok(())
    }

    async fn download(&self, oid: &Oid) -> Result<Bytes> {
        self.data
            .read()
            .get(oid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("object {}", oid)))
    }

    async fn delete(&self, oid: &Oid) -> Result<bool> {
        Ok(self.data.write().remove(oid).is_some())
    }

    async fn generate_upload_url(&self, oid: &Oid, _size: u64, expiry: Duration) -> Result<PresignedUrl> {
        Ok(self.signer.presign(oid, TransferOperation::Upload, expiry))
    }

    async fn generate_download_url(&self, oid: &Oid, expiry: Duration) -> Result<PresignedUrl> {
        Ok(self.signer.presign(oid, TransferOperation::Download, expiry))
    }
}
