//! Authorization for Depot.
//!
//! This crate provides:
//! - **Permissions**: ordered access levels (Read < Write < Admin)
//! - **Collaborators**: direct repository access grants and their store
//! - **Access evaluation**: the rules combining visibility, ownership and
//!   collaborator grants into an allow/deny decision
//!
//! # Example
//!
//! ```
//! use depot_auth::{Permission, Collaborator};
//! use depot_types::{RepositoryId, UserId};
//!
//! let grant = Collaborator::new(
//!     RepositoryId::generate(),
//!     UserId::new("bob"),
//!     Permission::Write,
//!     UserId::new("alice"),
//! );
//!
//! assert!(grant.has_permission(Permission::Read));
//! assert!(!grant.has_permission(Permission::Admin));
//! ```

mod access;
mod collaborator;
mod error;
mod permission;
mod store;

pub use access::{AccessControl, AccessDecision, AccessEvaluator};
pub use collaborator::Collaborator;
pub use error::{AuthError, Result};
pub use permission::Permission;
pub use store::{CollaboratorStore, MemoryCollaboratorStore};
