//! Git LFS for Depot.
//!
//! This crate implements the server side of the
//! [Git LFS Batch API](https://github.com/git-lfs/git-lfs/blob/main/docs/api/batch.md)
//! and the [file locking API](https://github.com/git-lfs/git-lfs/blob/main/docs/api/locking.md):
//!
//! - [`ObjectCoordinator`]: answers batch requests with presigned transfer
//!   actions, deduplicates uploads by content hash and verifies uploads
//!   before recording them.
//! - [`LockManager`]: exclusive per-path locks with owner and force unlock.
//!
//! Objects are content addressed: one stored blob may be linked to any
//! number of repositories, so uploading a file another repository already
//! holds only creates a link.

mod coordinator;
mod error;
mod lock;
mod locks;
mod object;
pub mod protocol;
mod store;

pub use coordinator::{is_valid_oid, LfsOptions, ObjectCoordinator};
pub use error::{LfsError, Result};
pub use lock::LfsLock;
pub use locks::{LockFilter, LockManager, LockVerification};
pub use object::{LfsObject, LfsRepoObject, DEFAULT_CONTENT_TYPE};
pub use store::{LfsObjectStore, LockStore, MemoryLfsObjectStore, MemoryLockStore};

/// Media type of every LFS API request and response body.
pub const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";
