//! # Collaboration API
//!
//! Pull request endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/repos/{id}/pulls` | List pull requests, newest first |
//! | POST | `/api/repos/{id}/pulls` | Open a pull request |
//! | GET | `/api/repos/{id}/pulls/{number}` | Get a pull request |
//! | PATCH | `/api/repos/{id}/pulls/{number}` | Update title, description or status |
//! | POST | `/api/repos/{id}/pulls/{number}/merge` | Merge the pull request |
//!
//! ## State Transitions
//!
//! ```text
//! Open ──┬──> Closed ──> Open (reopen)
//!        └──> Merged (terminal)
//! ```
//!
//! ## Example: Opening a Pull Request
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/repos/$REPO_ID/pulls \
//!   -H "Content-Type: application/json" \
//!   -H "x-depot-user: bob" \
//!   -d '{
//!     "title": "Add new feature",
//!     "description": "Implements the requested feature",
//!     "source_branch": "feature/new-feature",
//!     "target_branch": "main"
//!   }'
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use depot_collaboration::{NewPullRequest, PullRequestStatus, PullRequestUpdate};
use depot_types::RepositoryId;
use serde::Deserialize;

use crate::api::{ApiError, AppState, Caller};

/// Creates the collaboration API routes.
pub fn collaboration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/repos/{id}/pulls", get(list_prs).post(create_pr))
        .route(
            "/api/repos/{id}/pulls/{number}",
            get(get_pr).patch(update_pr),
        )
        .route("/api/repos/{id}/pulls/{number}/merge", post(merge_pr))
}

/// Query parameters for listing pull requests.
#[derive(Debug, Deserialize)]
pub struct ListPRsQuery {
    pub status: Option<PullRequestStatus>,
}

/// Lists pull requests.
async fn list_prs(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Query(query): Query<ListPRsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prs = state.pulls.list(&id, query.status, caller.user()).await?;
    Ok(Json(prs))
}

/// Opens a pull request.
async fn create_pr(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<NewPullRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pr = state.pulls.create(&id, caller.require()?, req).await?;
    Ok((StatusCode::CREATED, Json(pr)))
}

/// Gets a pull request.
async fn get_pr(
    State(state): State<AppState>,
    Path((id, number)): Path<(RepositoryId, u32)>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let pr = state.pulls.get(&id, number, caller.user()).await?;
    Ok(Json(pr))
}

/// Updates a pull request.
async fn update_pr(
    State(state): State<AppState>,
    Path((id, number)): Path<(RepositoryId, u32)>,
    caller: Caller,
    Json(req): Json<PullRequestUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let pr = state
        .pulls
        .update(&id, number, caller.require()?, req)
        .await?;
    Ok(Json(pr))
}

/// Merges a pull request.
async fn merge_pr(
    State(state): State<AppState>,
    Path((id, number)): Path<(RepositoryId, u32)>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let pr = state.pulls.merge(&id, number, caller.require()?).await?;
    Ok(Json(pr))
}
