//! Repository lifecycle for Depot.
//!
//! This crate owns the repository entity once it leaves the wire:
//!
//! - [`RepositoryManager`]: create, read, list, update and delete
//!   repositories, initializing bare storage before a row is committed.
//! - [`CollaboratorRegistry`]: owner-managed collaborator grants.
//! - [`slugify`]: the deterministic name to slug mapping.
//! - [`RepositoryStore`] and [`QuotaProvider`]: the persistence and quota
//!   ports, with in-memory implementations.
//!
//! # Example
//!
//! ```
//! use depot_repo::{is_valid_slug, slugify};
//!
//! let slug = slugify("My Cool_Repo!");
//! assert_eq!(slug, "my-cool-repo");
//! assert!(is_valid_slug(&slug));
//! ```

mod collaborators;
mod error;
mod manager;
mod memory;
mod quota;
mod slug;
mod store;

pub use collaborators::CollaboratorRegistry;
pub use error::{RepoError, Result};
pub use manager::{NewRepository, RepoManagerOptions, RepositoryManager, RepositoryUpdate, StorageStats};
pub use memory::MemoryRepositoryStore;
pub use quota::{FixedQuota, QuotaProvider};
pub use slug::{derive_slug, is_valid_slug, slugify, MAX_SLUG_LENGTH};
pub use store::{RepositoryFilter, RepositoryOrder, RepositoryQuery, RepositoryStore, Viewer};
