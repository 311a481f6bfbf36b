//! Local filesystem blob store.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::blob::check_content;
use crate::{BlobStore, Oid, PresignedUrl, Result, StorageError, TransferOperation, UrlSigner};

/// Stores LFS objects in a sharded directory tree:
///
/// ```text
/// {root}/
///   {oid[0..2]}/
///     {oid[2..4]}/
///       {oid}
/// ```
pub struct FsBlobStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, oid: &Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..4]).join(hex)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, oid: &Oid) -> Result<bool> {
        Ok(fs::try_exists(self.object_path(oid)).await?)
    }

    async fn size(&self, oid: &Oid) -> Result<Option<u64>> {
        match fs::metadata(self.object_path(oid)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, oid: &Oid, data: Bytes) -> Result<()> {
        check_content(oid, &data)?;

        let path = self.object_path(oid);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a unique temp file and rename so concurrent uploads of the
        // same oid never expose a partially written object.
        let tmp = path.with_extension(format!("tmp-{}", tmp_suffix()));
        fs::write(&tmp, &data).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn download(&self, oid: &Oid) -> Result<Bytes> {
        match fs::read(self.object_path(oid)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("object {}", oid)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, oid: &Oid) -> Result<bool> {
        match fs::remove_file(self.object_path(oid)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn generate_upload_url(&self, oid: &Oid, _size: u64, expiry: Duration) -> Result<PresignedUrl> {
        Ok(self.signer.presign(oid, TransferOperation::Upload, expiry))
    }

    async fn generate_download_url(&self, oid: &Oid, expiry: Duration) -> Result<PresignedUrl> {
        Ok(self.signer.presign(oid, TransferOperation::Download, expiry))
    }
}

fn tmp_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}
