//! Presigned transfer URLs.
//!
//! URLs have the form `{base}/lfs/objects/{oid}?expires={unix}&sig={hex}`.
//! The signature is an HMAC-SHA256 over the oid, the operation and the
//! expiry, so a URL issued for download cannot be replayed as an upload.

use depot_types::Timestamp;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::{Oid, PresignedUrl, Result, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// The transfer a presigned URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOperation {
    /// `GET` the object bytes.
    Download,
    /// `PUT` the object bytes.
    Upload,
}

impl TransferOperation {
    /// HTTP method a client must use.
    pub fn method(&self) -> &'static str {
        match self {
            TransferOperation::Download => "GET",
            TransferOperation::Upload => "PUT",
        }
    }
}

impl fmt::Display for TransferOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOperation::Download => write!(f, "download"),
            TransferOperation::Upload => write!(f, "upload"),
        }
    }
}

/// Issues and validates presigned transfer URLs.
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    key: HmacSha256,
}

impl UrlSigner {
    /// Creates a signer for URLs rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, secret: impl AsRef<[u8]>) -> Result<Self> {
        let key = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        })
    }

    /// Issues a URL for `operation` on `oid`, valid for `expiry`.
    pub fn presign(&self, oid: &Oid, operation: TransferOperation, expiry: Duration) -> PresignedUrl {
        self.presign_at(oid, operation, expiry, Timestamp::now())
    }

    /// Issues a URL as if the current time were `now`.
    pub fn presign_at(
        &self,
        oid: &Oid,
        operation: TransferOperation,
        expiry: Duration,
        now: Timestamp,
    ) -> PresignedUrl {
        let expires_at = now.add(expiry);
        let expires = expires_at.as_secs();
        let sig = hex::encode(self.mac(oid, operation, expires).finalize().into_bytes());

        let mut headers = HashMap::new();
        if operation == TransferOperation::Upload {
            headers.insert(
                "Content-Type".to_string(),
                "application/octet-stream".to_string(),
            );
        }

        PresignedUrl {
            url: format!(
                "{}/lfs/objects/{}?expires={}&sig={}",
                self.base_url, oid, expires, sig
            ),
            method: operation.method().to_string(),
            headers,
            expires_at,
        }
    }

    /// Checks a signature presented with a transfer request.
    pub fn verify(&self, oid: &Oid, operation: TransferOperation, expires: i64, sig: &str) -> bool {
        self.verify_at(oid, operation, expires, sig, Timestamp::now())
    }

    /// Checks a signature as if the current time were `now`.
    pub fn verify_at(
        &self,
        oid: &Oid,
        operation: TransferOperation,
        expires: i64,
        sig: &str,
        now: Timestamp,
    ) -> bool {
        if now.as_secs() > expires {
            tracing::debug!(%oid, expires, "presigned url expired");
            return false;
        }

        let Ok(sig) = hex::decode(sig) else {
            return false;
        };
        self.mac(oid, operation, expires).verify_slice(&sig).is_ok()
    }

    fn mac(&self, oid: &Oid, operation: TransferOperation, expires: i64) -> HmacSha256 {
        let mut mac = self.key.clone();
        mac.update(oid.as_bytes());
        mac.update(operation.to_string().as_bytes());
        mac.update(&expires.to_le_bytes());
        mac
    }
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
