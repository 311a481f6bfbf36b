//! Pull request workflow tests.

use async_trait::async_trait;
use depot_auth::{
    AccessEvaluator, Collaborator, CollaboratorStore, MemoryCollaboratorStore, Permission,
};
use depot_collaboration::{
    CollaborationError, MemoryPullRequestStore, NewPullRequest, PullRequest, PullRequestService,
    PullRequestStatus, PullRequestStore, PullRequestUpdate, MAX_NUMBER_ATTEMPTS,
};
use depot_repo::{MemoryRepositoryStore, RepositoryStore};
use depot_types::{
    ErrorKind, RepoType, Repository, RepositoryId, Timestamp, UserId, Visibility,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    collaborators: Arc<MemoryCollaboratorStore>,
    service: Arc<PullRequestService>,
    repo: Repository,
}

fn repository(owner: &str, visibility: Visibility) -> Repository {
    let now = Timestamp::now();
    let id = RepositoryId::generate();
    Repository {
        id,
        owner: owner.into(),
        name: "project".into(),
        slug: "project".into(),
        repo_type: RepoType::Code,
        visibility,
        description: String::new(),
        default_branch: "main".into(),
        size_bytes: 0,
        lfs_size_bytes: 0,
        lfs_enabled: false,
        storage_path: format!("repos/{}/{}/", owner, id),
        stars: 0,
        forks: 0,
        forked_from: None,
        created_at: now,
        updated_at: now,
        pushed_at: None,
    }
}

async fn harness_with(visibility: Visibility, pulls: Arc<dyn PullRequestStore>) -> Harness {
    let repos = Arc::new(MemoryRepositoryStore::new());
    let repo = repository("alice", visibility);
    repos.insert(repo.clone()).await.unwrap();

    let collaborators = Arc::new(MemoryCollaboratorStore::new());
    let access = Arc::new(AccessEvaluator::new(collaborators.clone()));
    let service = Arc::new(PullRequestService::new(repos, pulls, access));

    Harness {
        collaborators,
        service,
        repo,
    }
}

async fn harness(visibility: Visibility) -> Harness {
    harness_with(visibility, Arc::new(MemoryPullRequestStore::new())).await
}

fn proposal(source: &str) -> NewPullRequest {
    NewPullRequest {
        title: "Add feature".into(),
        description: "Adds a feature".into(),
        source_branch: source.into(),
        target_branch: "main".into(),
    }
}

async fn grant(h: &Harness, user: &str, permission: Permission) {
    h.collaborators
        .insert(Collaborator::new(h.repo.id, user.into(), permission, "alice".into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_assigns_sequential_numbers() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");

    let first = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();
    let second = h.service.create(&h.repo.id, &alice, proposal("b")).await.unwrap();

    assert_eq!(first.number, 1);
    assert_eq!(second.number, 2);
    assert_eq!(first.status, PullRequestStatus::Open);
    assert_eq!(first.author, alice);

    let listed: Vec<u32> = h
        .service
        .list(&h.repo.id, None, None)
        .await
        .unwrap()
        .iter()
        .map(|pr| pr.number)
        .collect();
    assert_eq!(listed, vec![2, 1]);
}

#[tokio::test]
async fn create_validates_input() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");

    let err = h
        .service
        .create(&h.repo.id, &alice, proposal("main"))
        .await
        .unwrap_err();
    assert!(matches!(err, CollaborationError::SameBranch(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mut blank = proposal("a");
    blank.title = "   ".into();
    assert_eq!(
        h.service
            .create(&h.repo.id, &alice, blank)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidInput
    );

    let err = h
        .service
        .create(&RepositoryId::generate(), &alice, proposal("a"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn create_on_private_repo_requires_read() {
    let h = harness(Visibility::Private).await;
    let bob = UserId::new("bob");

    let err = h
        .service
        .create(&h.repo.id, &bob, proposal("a"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    grant(&h, "bob", Permission::Read).await;
    let pr = h.service.create(&h.repo.id, &bob, proposal("a")).await.unwrap();
    assert_eq!(pr.number, 1);

    assert_eq!(
        h.service.get(&h.repo.id, 1, None).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );
    assert_eq!(
        h.service
            .get(&h.repo.id, 2, Some(&bob))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn update_closes_and_reopens() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");
    let pr = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();

    let closed = h
        .service
        .update(
            &h.repo.id,
            pr.number,
            &alice,
            PullRequestUpdate {
                status: Some(PullRequestStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(closed.status, PullRequestStatus::Closed);
    assert!(closed.closed_at.is_some());

    let closed_only = h
        .service
        .list(&h.repo.id, Some(PullRequestStatus::Closed), None)
        .await
        .unwrap();
    assert_eq!(closed_only.len(), 1);

    let reopened = h
        .service
        .update(
            &h.repo.id,
            pr.number,
            &alice,
            PullRequestUpdate {
                status: Some(PullRequestStatus::Open),
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(reopened.status, PullRequestStatus::Open);
    assert!(reopened.closed_at.is_none());
    assert_eq!(reopened.title, "Renamed");
    assert_eq!(reopened.description, "Adds a feature");
}

#[tokio::test]
async fn update_permissions_and_validation() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let carol = UserId::new("carol");

    grant(&h, "bob", Permission::Read).await;
    // bob authored the PR and may edit it despite holding only read.
    let pr = h.service.create(&h.repo.id, &bob, proposal("a")).await.unwrap();
    let retitled = h
        .service
        .update(
            &h.repo.id,
            pr.number,
            &bob,
            PullRequestUpdate {
                title: Some("Better title".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(retitled.title, "Better title");

    // carol is neither author nor writer.
    let err = h
        .service
        .update(&h.repo.id, pr.number, &carol, PullRequestUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    let err = h
        .service
        .update(
            &h.repo.id,
            pr.number,
            &alice,
            PullRequestUpdate {
                status: Some(PullRequestStatus::Merged),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn merge_records_outcome_once() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let pr = h.service.create(&h.repo.id, &bob, proposal("a")).await.unwrap();

    // bob has no write access.
    assert_eq!(
        h.service
            .merge(&h.repo.id, pr.number, &bob)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::AccessDenied
    );

    let merged = h.service.merge(&h.repo.id, pr.number, &alice).await.unwrap();
    assert_eq!(merged.status, PullRequestStatus::Merged);
    assert_eq!(merged.merged_by, Some(alice.clone()));

    grant(&h, "carol", Permission::Write).await;
    let carol = UserId::new("carol");
    let err = h
        .service
        .merge(&h.repo.id, pr.number, &carol)
        .await
        .unwrap_err();
    assert!(matches!(err, CollaborationError::AlreadyMerged { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = h
        .service
        .update(
            &h.repo.id,
            pr.number,
            &bob,
            PullRequestUpdate {
                title: Some("late".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollaborationError::AlreadyMerged { .. }));

    let stored = h.service.get(&h.repo.id, pr.number, None).await.unwrap();
    assert_eq!(stored.merged_by, merged.merged_by);
    assert_eq!(stored.merged_at, merged.merged_at);
    assert_eq!(stored.title, "Add feature");
}

#[tokio::test]
async fn merge_closed_fails() {
    let h = harness(Visibility::Public).await;
    let alice = UserId::new("alice");
    let pr = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();
    h.service
        .update(
            &h.repo.id,
            pr.number,
            &alice,
            PullRequestUpdate {
                status: Some(PullRequestStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h
        .service
        .merge(&h.repo.id, pr.number, &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, CollaborationError::AlreadyClosed { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_unique_numbers() {
    let h = harness(Visibility::Public).await;
    let mut handles = Vec::new();

    for i in 0..50 {
        let service = h.service.clone();
        let repo_id = h.repo.id;
        handles.push(tokio::spawn(async move {
            service
                .create(&repo_id, &UserId::new("alice"), proposal(&format!("branch-{i}")))
                .await
                .unwrap()
                .number
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }

    let unique: HashSet<u32> = numbers.iter().copied().collect();
    assert_eq!(unique.len(), 50);
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=50).collect::<Vec<_>>());
}

/// Hands out stale numbers for the first few allocations, like a counter
/// that lags behind the table.
struct LaggingCounter {
    inner: MemoryPullRequestStore,
    stale: AtomicU32,
}

#[async_trait]
impl PullRequestStore for LaggingCounter {
    async fn next_number(&self, repo_id: &RepositoryId) -> depot_collaboration::Result<u32> {
        if self.stale.load(Ordering::SeqCst) > 0 {
            self.stale.fetch_sub(1, Ordering::SeqCst);
            return Ok(1);
        }
        self.inner.next_number(repo_id).await
    }

    async fn insert(&self, pr: PullRequest) -> depot_collaboration::Result<()> {
        self.inner.insert(pr).await
    }

    async fn get(&self, repo_id: &RepositoryId, number: u32) -> depot_collaboration::Result<Option<PullRequest>> {
        self.inner.get(repo_id, number).await
    }

    async fn list(
        &self,
        repo_id: &RepositoryId,
        status: Option<PullRequestStatus>,
    ) -> depot_collaboration::Result<Vec<PullRequest>> {
        self.inner.list(repo_id, status).await
    }

    async fn update(&self, current: &PullRequest, updated: PullRequest) -> depot_collaboration::Result<()> {
        self.inner.update(current, updated).await
    }
}

#[tokio::test]
async fn create_retries_taken_numbers() {
    let store = Arc::new(LaggingCounter {
        inner: MemoryPullRequestStore::new(),
        stale: AtomicU32::new(0),
    });
    let h = harness_with(Visibility::Public, store.clone()).await;
    let alice = UserId::new("alice");

    let first = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();
    assert_eq!(first.number, 1);

    // Two stale allocations, then the real counter yields 2.
    store.stale.store(2, Ordering::SeqCst);
    let second = h.service.create(&h.repo.id, &alice, proposal("b")).await.unwrap();
    assert_eq!(second.number, 2);

    // More stale allocations than attempts.
    store.stale.store(MAX_NUMBER_ATTEMPTS as u32, Ordering::SeqCst);
    let err = h
        .service
        .create(&h.repo.id, &alice, proposal("c"))
        .await
        .unwrap_err();
    assert!(matches!(err, CollaborationError::NumberExhausted { .. }));
    assert_eq!(err.kind(), ErrorKind::Unavailable);
}

/// Store whose reads take a while, so concurrent writers read the same
/// record before either writes.
struct SlowReads {
    inner: MemoryPullRequestStore,
}

#[async_trait]
impl PullRequestStore for SlowReads {
    async fn next_number(&self, repo_id: &RepositoryId) -> depot_collaboration::Result<u32> {
        self.inner.next_number(repo_id).await
    }

    async fn insert(&self, pr: PullRequest) -> depot_collaboration::Result<()> {
        self.inner.insert(pr).await
    }

    async fn get(&self, repo_id: &RepositoryId, number: u32) -> depot_collaboration::Result<Option<PullRequest>> {
        let pr = self.inner.get(repo_id, number).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        pr
    }

    async fn list(
        &self,
        repo_id: &RepositoryId,
        status: Option<PullRequestStatus>,
    ) -> depot_collaboration::Result<Vec<PullRequest>> {
        self.inner.list(repo_id, status).await
    }

    async fn update(&self, current: &PullRequest, updated: PullRequest) -> depot_collaboration::Result<()> {
        self.inner.update(current, updated).await
    }
}

async fn slow_harness() -> Harness {
    let store = Arc::new(SlowReads {
        inner: MemoryPullRequestStore::new(),
    });
    let h = harness_with(Visibility::Public, store).await;
    grant(&h, "bob", Permission::Write).await;
    h
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_merges_record_one_outcome() {
    let h = slow_harness().await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let pr = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();

    let (first, second) = tokio::join!(
        h.service.merge(&h.repo.id, pr.number, &alice),
        h.service.merge(&h.repo.id, pr.number, &bob),
    );

    let (winner, loser) = match (first, second) {
        (Ok(merged), Err(e)) | (Err(e), Ok(merged)) => (merged, e),
        (a, b) => panic!("expected exactly one merge to succeed: {:?} / {:?}", a, b),
    };
    assert!(matches!(loser, CollaborationError::AlreadyMerged { .. }));

    let stored = h.service.get(&h.repo.id, pr.number, None).await.unwrap();
    assert_eq!(stored.status, PullRequestStatus::Merged);
    assert_eq!(stored.merged_by, winner.merged_by);
    assert_eq!(stored.merged_at, winner.merged_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_racing_merge_cannot_undo_it() {
    let h = slow_harness().await;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let pr = h.service.create(&h.repo.id, &alice, proposal("a")).await.unwrap();

    let close = PullRequestUpdate {
        status: Some(PullRequestStatus::Closed),
        ..Default::default()
    };
    let (merged, closed) = tokio::join!(
        h.service.merge(&h.repo.id, pr.number, &alice),
        h.service.update(&h.repo.id, pr.number, &bob, close),
    );

    let stored = h.service.get(&h.repo.id, pr.number, None).await.unwrap();
    match (merged, closed) {
        (Ok(merged), Err(e)) => {
            assert!(matches!(e, CollaborationError::AlreadyMerged { .. }));
            assert_eq!(stored.status, PullRequestStatus::Merged);
            assert_eq!(stored.merged_by, merged.merged_by);
        }
        (Err(e), Ok(_)) => {
            assert!(matches!(e, CollaborationError::AlreadyClosed { .. }));
            assert_eq!(stored.status, PullRequestStatus::Closed);
            assert!(stored.merged_by.is_none());
        }
        (a, b) => panic!("expected exactly one transition to succeed: {:?} / {:?}", a, b),
    }
}
