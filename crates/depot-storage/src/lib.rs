//! Storage ports for Depot.
//!
//! This crate provides the two storage collaborators the service core talks
//! to:
//!
//! - [`RepoStorage`]: initializes and removes bare Git repository layouts.
//! - [`BlobStore`]: content-addressed LFS object storage keyed by [`Oid`],
//!   including presigned transfer URLs.
//!
//! Filesystem and in-memory implementations are included. Presigned URLs
//! are issued by [`UrlSigner`], which signs a URL with a shared secret so the
//! transfer endpoint can validate it without a database lookup.

mod bare;
mod blob;
mod error;
mod fs_blob;
mod oid;
mod signer;

pub use bare::{BareLayout, FsRepoStorage, RepoStorage};
pub use blob::{BlobStore, MemoryBlobStore, PresignedUrl};
pub use error::{Result, StorageError};
pub use fs_blob::FsBlobStore;
pub use oid::Oid;
pub use signer::{TransferOperation, UrlSigner};
