//! # Repository API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/repos` | List repositories visible to the caller |
//! | POST | `/api/repos` | Create a repository owned by the caller |
//! | GET | `/api/repos/public` | List public repositories, most starred first |
//! | GET | `/api/repos/{id}` | Get a repository |
//! | PATCH | `/api/repos/{id}` | Update a repository |
//! | DELETE | `/api/repos/{id}` | Delete a repository |
//! | GET | `/api/repos/{id}/stats` | Storage usage |
//! | GET | `/api/repos/{id}/collaborators` | List collaborators |
//! | POST | `/api/repos/{id}/collaborators` | Add a collaborator |
//! | PUT | `/api/repos/{id}/collaborators/{user}` | Change a collaborator's permission |
//! | DELETE | `/api/repos/{id}/collaborators/{user}` | Remove a collaborator |
//!
//! List endpoints accept `owner`, `type`, `visibility`, `search`, `page` and
//! `per_page` query parameters.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use depot_auth::Permission;
use depot_repo::{NewRepository, RepositoryFilter, RepositoryUpdate};
use depot_types::{Pagination, RepoType, RepositoryId, UserId, Visibility};
use serde::Deserialize;

use crate::api::{ApiError, AppState, Caller};

/// Creates the repository API routes.
pub fn repo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/repos", get(list_repos).post(create_repo))
        .route("/api/repos/public", get(list_public_repos))
        .route(
            "/api/repos/{id}",
            get(get_repo).patch(update_repo).delete(delete_repo),
        )
        .route("/api/repos/{id}/stats", get(repo_stats))
        .route(
            "/api/repos/{id}/collaborators",
            get(list_collaborators).post(add_collaborator),
        )
        .route(
            "/api/repos/{id}/collaborators/{user}",
            put(update_collaborator).delete(remove_collaborator),
        )
}

// ==================== Request Types ====================

/// Query parameters for listing repositories.
#[derive(Debug, Default, Deserialize)]
pub struct ListReposQuery {
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub repo_type: Option<RepoType>,
    pub visibility: Option<Visibility>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListReposQuery {
    fn split(self) -> (RepositoryFilter, Pagination) {
        let defaults = Pagination::default();
        let pagination = Pagination::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        );
        let filter = RepositoryFilter {
            owner: self.owner.map(UserId::from),
            repo_type: self.repo_type,
            visibility: self.visibility,
            search: self.search,
        };
        (filter, pagination)
    }
}

/// Request to add a collaborator. `permission` defaults to read.
#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub user: String,
    #[serde(default)]
    pub permission: Option<String>,
}

/// Request to change a collaborator's permission.
#[derive(Debug, Deserialize)]
pub struct UpdateCollaboratorRequest {
    pub permission: String,
}

// ==================== Repository Handlers ====================

/// Lists repositories visible to the caller.
async fn list_repos(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListReposQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, pagination) = query.split();
    let page = state.repos.list(filter, pagination, caller.user()).await?;
    Ok(Json(page))
}

/// Lists public repositories.
async fn list_public_repos(
    State(state): State<AppState>,
    Query(query): Query<ListReposQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, pagination) = query.split();
    let page = state.repos.list_public(filter, pagination).await?;
    Ok(Json(page))
}

/// Creates a repository owned by the caller.
async fn create_repo(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewRepository>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = caller.require()?;
    let repo = state.repos.create(owner, req).await?;
    Ok((StatusCode::CREATED, Json(repo)))
}

/// Gets a repository.
async fn get_repo(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.repos.get(&id, caller.user()).await?;
    Ok(Json(repo))
}

/// Updates a repository.
async fn update_repo(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<RepositoryUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.repos.update(&id, caller.require()?, req).await?;
    Ok(Json(repo))
}

/// Deletes a repository.
async fn delete_repo(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    state.repos.delete(&id, caller.require()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns storage usage.
async fn repo_stats(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.repos.storage_stats(&id, caller.user()).await?;
    Ok(Json(stats))
}

// ==================== Collaborator Handlers ====================

/// Lists collaborators.
async fn list_collaborators(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let collaborators = state.collaborators.list(&id, caller.user()).await?;
    Ok(Json(collaborators))
}

/// Adds a collaborator.
async fn add_collaborator(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<AddCollaboratorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user.trim().is_empty() {
        return Err(ApiError::BadRequest("user must not be empty".into()));
    }
    let permission = match req.permission.as_deref() {
        Some(permission) => permission.parse::<Permission>()?,
        None => Permission::default(),
    };
    let collaborator = state
        .collaborators
        .add(&id, caller.require()?, UserId::from(req.user.trim()), permission)
        .await?;
    Ok((StatusCode::CREATED, Json(collaborator)))
}

/// Changes a collaborator's permission.
async fn update_collaborator(
    State(state): State<AppState>,
    Path((id, user)): Path<(RepositoryId, String)>,
    caller: Caller,
    Json(req): Json<UpdateCollaboratorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = req.permission.parse::<Permission>()?;
    let collaborator = state
        .collaborators
        .update(&id, caller.require()?, &UserId::from(user), permission)
        .await?;
    Ok(Json(collaborator))
}

/// Removes a collaborator.
async fn remove_collaborator(
    State(state): State<AppState>,
    Path((id, user)): Path<(RepositoryId, String)>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    state
        .collaborators
        .remove(&id, caller.require()?, &UserId::from(user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
