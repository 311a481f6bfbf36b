//! HTTP API for the Depot node.
//!
//! Holds the shared application state, the error mapping from core error
//! kinds to HTTP status codes, and the router that mounts every endpoint.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use depot_auth::{AccessEvaluator, AuthError, MemoryCollaboratorStore};
use depot_collaboration::{CollaborationError, MemoryPullRequestStore, PullRequestService};
use depot_lfs::{LfsError, LockManager, MemoryLfsObjectStore, MemoryLockStore, ObjectCoordinator};
use depot_repo::{
    CollaboratorRegistry, FixedQuota, MemoryRepositoryStore, RepoError, RepositoryManager,
};
use depot_storage::{BlobStore, FsBlobStore, FsRepoStorage, StorageError, UrlSigner};
use depot_types::{ErrorKind, UserId};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::collaboration_api::collaboration_routes;
use crate::config::Config;
use crate::lfs_api::{lfs_routes, transfer_routes};
use crate::repo_api::repo_routes;

/// Header carrying the caller's user id. Absent means anonymous.
pub const USER_HEADER: &str = "x-depot-user";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository lifecycle.
    pub repos: Arc<RepositoryManager>,
    /// Collaborator grants.
    pub collaborators: Arc<CollaboratorRegistry>,
    /// Pull requests.
    pub pulls: Arc<PullRequestService>,
    /// LFS batch and verify.
    pub lfs: Arc<ObjectCoordinator>,
    /// LFS locks.
    pub locks: Arc<LockManager>,
    /// Blob store behind presigned transfers.
    pub blobs: Arc<dyn BlobStore>,
    /// Signer of presigned transfer URLs.
    pub signer: UrlSigner,
    /// Largest object accepted by the transfer endpoint.
    pub max_object_size: u64,
}

impl AppState {
    /// Wires the services for `config`: bare repositories and LFS objects
    /// on disk, metadata in memory.
    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        let repo_store = Arc::new(MemoryRepositoryStore::new());
        let collaborator_store = Arc::new(MemoryCollaboratorStore::new());
        let access = Arc::new(AccessEvaluator::new(collaborator_store.clone()));

        let signer = UrlSigner::new(&config.server.public_url, &config.lfs.signing_secret)?;
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_dir(), signer.clone()));

        let mut repos = RepositoryManager::new(
            repo_store.clone(),
            Arc::new(FsRepoStorage::new(&config.storage.data_dir)),
            access.clone(),
            collaborator_store.clone(),
            config.repo_options(),
        );
        if config.quota.default_quota_bytes > 0 {
            repos = repos.with_quota(Arc::new(FixedQuota::new(
                config.quota.default_quota_bytes,
                repo_store.clone(),
            )));
        }

        let collaborators =
            CollaboratorRegistry::new(repo_store.clone(), collaborator_store, access.clone());
        let pulls = PullRequestService::new(
            repo_store.clone(),
            Arc::new(MemoryPullRequestStore::new()),
            access.clone(),
        );
        let lfs = ObjectCoordinator::new(
            repo_store.clone(),
            Arc::new(MemoryLfsObjectStore::new()),
            blobs.clone(),
            access.clone(),
            config.lfs_options(),
        );
        let locks = LockManager::new(repo_store, Arc::new(MemoryLockStore::new()), access);

        Ok(Self {
            repos: Arc::new(repos),
            collaborators: Arc::new(collaborators),
            pulls: Arc::new(pulls),
            lfs: Arc::new(lfs),
            locks: Arc::new(locks),
            blobs,
            signer,
            max_object_size: config.lfs.max_object_size,
        })
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Collaboration(#[from] CollaborationError),
    #[error(transparent)]
    Lfs(#[from] LfsError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Repo(e) => e.kind(),
            ApiError::Collaboration(e) => e.kind(),
            ApiError::Lfs(e) => e.kind(),
            ApiError::Auth(e) => e.kind(),
            ApiError::Unauthenticated => ErrorKind::AccessDenied,
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
        }
    }

    /// HTTP status for the error.
    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }
}

/// Maps an error kind to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::NotOwner => StatusCode::FORBIDDEN,
        ErrorKind::QuotaExceeded => StatusCode::INSUFFICIENT_STORAGE,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// The caller named by the [`USER_HEADER`] header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(pub Option<UserId>);

impl Caller {
    /// The caller, or `None` when anonymous.
    pub fn user(&self) -> Option<&UserId> {
        self.0.as_ref()
    }

    /// The caller, failing for anonymous requests.
    pub fn require(&self) -> Result<&UserId, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(UserId::from);
        Ok(Caller(user))
    }
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(repo_routes())
        .merge(collaboration_routes())
        .merge(lfs_routes())
        .merge(transfer_routes(state.max_object_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
