//! Access evaluation.
//!
//! A caller may act on a repository when one of the following holds, checked
//! in order:
//!
//! 1. the repository is public and only read access is required;
//! 2. the caller owns the repository;
//! 3. the caller holds a collaborator grant of at least the required level.
//!
//! Anonymous callers only ever pass the first rule.

use async_trait::async_trait;
use depot_types::{Repository, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{AuthError, CollaboratorStore, Permission, Result};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Highest level the caller holds on the repository, if any.
    pub permission: Option<Permission>,
    /// Which rule decided.
    pub reason: String,
}

impl AccessDecision {
    fn allow(permission: Permission, reason: &str) -> Self {
        Self {
            allowed: true,
            permission: Some(permission),
            reason: reason.to_string(),
        }
    }

    fn deny(permission: Option<Permission>, reason: &str) -> Self {
        Self {
            allowed: false,
            permission,
            reason: reason.to_string(),
        }
    }
}

/// Access control port consumed by the service managers.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Decides whether `caller` holds `required` on `repo`.
    async fn decide(&self, repo: &Repository, caller: Option<&UserId>, required: Permission) -> Result<AccessDecision>;

    /// Returns whether access is allowed.
    async fn can_access(&self, repo: &Repository, caller: Option<&UserId>, required: Permission) -> Result<bool> {
        Ok(self.decide(repo, caller, required).await?.allowed)
    }

    /// Same evaluation as [`AccessControl::can_access`], failing with
    /// [`AuthError::AccessDenied`] instead of returning `false`.
    async fn check_access(&self, repo: &Repository, caller: Option<&UserId>, required: Permission) -> Result<()> {
        if self.can_access(repo, caller, required).await? {
            return Ok(());
        }
        Err(AuthError::AccessDenied(format!(
            "{} access to {} required",
            required,
            repo.full_name()
        )))
    }
}

/// Evaluates access from repository visibility, ownership and the
/// collaborator store.
#[derive(Clone)]
pub struct AccessEvaluator {
    collaborators: Arc<dyn CollaboratorStore>,
}

impl AccessEvaluator {
    /// Create an evaluator backed by `collaborators`.
    pub fn new(collaborators: Arc<dyn CollaboratorStore>) -> Self {
        Self { collaborators }
    }

    /// Get the effective permission for a caller on a repository.
    ///
    /// Owners hold admin, collaborators their grant, and anyone holds read on
    /// a public repository.
    pub async fn effective_permission(&self, repo: &Repository, caller: Option<&UserId>) -> Result<Option<Permission>> {
        let public = repo.is_public().then_some(Permission::Read);
        let Some(user) = caller else {
            return Ok(public);
        };
        if repo.is_owner(user) {
            return Ok(Some(Permission::Admin));
        }

        let granted = self
            .collaborators
            .get(&repo.id, user)
            .await?
            .map(|c| c.permission);
        Ok(granted.max(public))
    }
}

#[async_trait]
impl AccessControl for AccessEvaluator {
    async fn decide(&self, repo: &Repository, caller: Option<&UserId>, required: Permission) -> Result<AccessDecision> {
        if repo.is_public() && required == Permission::Read {
            let permission = match caller {
                Some(_) => self.effective_permission(repo, caller).await?,
                None => Some(Permission::Read),
            };
            return Ok(AccessDecision {
                allowed: true,
                permission,
                reason: "public repository".to_string(),
            });
        }

        let Some(user) = caller else {
            return Ok(AccessDecision::deny(None, "anonymous"));
        };
        if repo.is_owner(user) {
            return Ok(AccessDecision::allow(Permission::Admin, "owner"));
        }

        match self.collaborators.get(&repo.id, user).await? {
            None => {
                tracing::debug!(repo = %repo.id, user = %user, %required, "no collaborator grant");
                Ok(AccessDecision::deny(
                    repo.is_public().then_some(Permission::Read),
                    "not a collaborator",
                ))
            }
            Some(collab) if collab.has_permission(required) => {
                Ok(AccessDecision::allow(collab.permission, "collaborator"))
            }
            Some(collab) => Ok(AccessDecision::deny(
                Some(collab.permission),
                "insufficient permission",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Collaborator, MemoryCollaboratorStore};
    use depot_types::{RepoType, RepositoryId, Timestamp, Visibility};

    fn repo(visibility: Visibility) -> Repository {
        let now = Timestamp::now();
        Repository {
            id: RepositoryId::generate(),
            owner: UserId::new("alice"),
            name: "demo".into(),
            slug: "demo".into(),
            repo_type: RepoType::Code,
            visibility,
            description: String::new(),
            default_branch: "main".into(),
            size_bytes: 0,
            lfs_size_bytes: 0,
            lfs_enabled: true,
            storage_path: "repos/alice/demo/".into(),
            stars: 0,
            forks: 0,
            forked_from: None,
            created_at: now,
            updated_at: now,
            pushed_at: None,
        }
    }

    fn setup() -> (AccessEvaluator, Arc<MemoryCollaboratorStore>) {
        let store = Arc::new(MemoryCollaboratorStore::new());
        (AccessEvaluator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn public_repo_is_readable_anonymously() {
        let (access, _) = setup();
        let repo = repo(Visibility::Public);

        assert!(access.can_access(&repo, None, Permission::Read).await.unwrap());
        assert!(!access.can_access(&repo, None, Permission::Write).await.unwrap());

        let stranger = UserId::new("mallory");
        assert!(access.can_access(&repo, Some(&stranger), Permission::Read).await.unwrap());
        assert!(!access.can_access(&repo, Some(&stranger), Permission::Write).await.unwrap());
    }

    #[tokio::test]
    async fn private_repo_is_hidden_from_strangers() {
        let (access, _) = setup();
        let repo = repo(Visibility::Private);

        assert!(!access.can_access(&repo, None, Permission::Read).await.unwrap());
        let stranger = UserId::new("mallory");
        assert!(!access.can_access(&repo, Some(&stranger), Permission::Read).await.unwrap());

        let err = access
            .check_access(&repo, Some(&stranger), Permission::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn owner_has_admin() {
        let (access, _) = setup();
        let repo = repo(Visibility::Private);
        let alice = UserId::new("alice");

        let decision = access.decide(&repo, Some(&alice), Permission::Admin).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.permission, Some(Permission::Admin));
        assert_eq!(decision.reason, "owner");
    }

    #[tokio::test]
    async fn collaborator_grant_is_compared_by_level() {
        let (access, store) = setup();
        let repo = repo(Visibility::Private);
        let bob = UserId::new("bob");

        store
            .insert(Collaborator::new(repo.id, bob.clone(), Permission::Write, "alice".into()))
            .await
            .unwrap();

        assert!(access.can_access(&repo, Some(&bob), Permission::Read).await.unwrap());
        assert!(access.can_access(&repo, Some(&bob), Permission::Write).await.unwrap());

        let decision = access.decide(&repo, Some(&bob), Permission::Admin).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.permission, Some(Permission::Write));
    }

    #[tokio::test]
    async fn effective_permission_levels() {
        let (access, store) = setup();
        let public = repo(Visibility::Public);
        let private = repo(Visibility::Private);
        let bob = UserId::new("bob");

        assert_eq!(
            access.effective_permission(&public, None).await.unwrap(),
            Some(Permission::Read)
        );
        assert_eq!(access.effective_permission(&private, None).await.unwrap(), None);
        assert_eq!(
            access
                .effective_permission(&private, Some(&UserId::new("alice")))
                .await
                .unwrap(),
            Some(Permission::Admin)
        );

        store
            .insert(Collaborator::new(public.id, bob.clone(), Permission::Admin, "alice".into()))
            .await
            .unwrap();
        assert_eq!(
            access.effective_permission(&public, Some(&bob)).await.unwrap(),
            Some(Permission::Admin)
        );
    }
}
