//! Repository collaborator grants.

use crate::permission::Permission;
use depot_types::{RepositoryId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A collaborator on a repository.
///
/// Collaborators are users who have been explicitly granted access to a
/// repository. The owner is never stored as a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Repository the grant applies to.
    pub repo_id: RepositoryId,
    /// User receiving the grant.
    pub user: UserId,
    /// Permission level granted.
    pub permission: Permission,
    /// Who added this collaborator.
    pub added_by: UserId,
    /// When the collaborator was added.
    pub created_at: Timestamp,
    /// When the permission was last updated.
    pub updated_at: Timestamp,
}

impl Collaborator {
    /// Create a new collaborator grant.
    pub fn new(repo_id: RepositoryId, user: UserId, permission: Permission, added_by: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            repo_id,
            user,
            permission,
            added_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if this collaborator has at least the required permission.
    pub fn has_permission(&self, required: Permission) -> bool {
        self.permission.has(required)
    }

    /// Update the permission level.
    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_creation() {
        let repo = RepositoryId::generate();
        let collab = Collaborator::new(repo, "user123".into(), Permission::Write, "owner".into());

        assert_eq!(collab.repo_id, repo);
        assert_eq!(collab.user.as_str(), "user123");
        assert_eq!(collab.permission, Permission::Write);
        assert!(collab.has_permission(Permission::Read));
        assert!(collab.has_permission(Permission::Write));
        assert!(!collab.has_permission(Permission::Admin));
    }

    #[test]
    fn test_collaborator_permission_update() {
        let mut collab = Collaborator::new(
            RepositoryId::generate(),
            "user123".into(),
            Permission::Read,
            "owner".into(),
        );

        assert!(!collab.has_permission(Permission::Write));

        collab.set_permission(Permission::Admin);
        assert!(collab.has_permission(Permission::Admin));
        assert!(collab.updated_at >= collab.created_at);
    }
}
