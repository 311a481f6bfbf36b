//! # Git LFS API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/repos/{id}/lfs/objects/batch` | Batch API |
//! | POST | `/api/repos/{id}/lfs/verify` | Confirm an upload |
//! | GET | `/api/repos/{id}/lfs/locks` | List locks |
//! | POST | `/api/repos/{id}/lfs/locks` | Create a lock |
//! | POST | `/api/repos/{id}/lfs/locks/verify` | Split locks into ours and theirs |
//! | POST | `/api/repos/{id}/lfs/locks/{lock_id}/unlock` | Release a lock |
//! | PUT | `/lfs/objects/{oid}?expires=&sig=` | Presigned upload |
//! | GET | `/lfs/objects/{oid}?expires=&sig=` | Presigned download |
//!
//! Bodies use `application/vnd.git-lfs+json` and errors are reported as
//! `{"message": "..."}`, as Git LFS clients expect. The transfer endpoints
//! authenticate by URL signature instead of the caller header.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use depot_auth::AuthError;
use depot_lfs::protocol::{
    BatchRequest, CreateLockRequest, ErrorBody, Lock, LockConflict, LockList, LockResponse,
    ObjectSpec, UnlockRequest, VerifyLocksRequest, VerifyLocksResponse,
};
use depot_lfs::{is_valid_oid, LfsError, LockFilter, LFS_MEDIA_TYPE};
use depot_storage::{Oid, StorageError, TransferOperation};
use depot_types::{LockId, RepositoryId};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState, Caller};

/// Creates the LFS API routes.
pub fn lfs_routes() -> Router<AppState> {
    Router::new()
        .route("/api/repos/{id}/lfs/objects/batch", post(batch))
        .route("/api/repos/{id}/lfs/verify", post(verify_object))
        .route("/api/repos/{id}/lfs/locks", get(list_locks).post(create_lock))
        .route("/api/repos/{id}/lfs/locks/verify", post(verify_locks))
        .route("/api/repos/{id}/lfs/locks/{lock_id}/unlock", post(unlock))
}

/// Creates the presigned transfer routes, accepting bodies up to
/// `max_object_size` bytes.
pub fn transfer_routes(max_object_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_object_size).unwrap_or(usize::MAX);
    Router::new()
        .route("/lfs/objects/{oid}", get(download_object).put(upload_object))
        .layer(DefaultBodyLimit::max(limit))
}

// ==================== Errors ====================

/// Error reported in the LFS body format.
#[derive(Debug)]
pub struct LfsApiError(ApiError);

impl From<ApiError> for LfsApiError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<LfsError> for LfsApiError {
    fn from(err: LfsError) -> Self {
        Self(ApiError::Lfs(err))
    }
}

impl From<StorageError> for LfsApiError {
    fn from(err: StorageError) -> Self {
        Self(ApiError::Lfs(LfsError::Storage(err)))
    }
}

impl IntoResponse for LfsApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "LFS request failed");
        }
        lfs_json(
            status,
            ErrorBody {
                message: self.0.to_string(),
            },
        )
    }
}

fn lfs_json<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, [(header::CONTENT_TYPE, LFS_MEDIA_TYPE)], Json(body)).into_response()
}

// ==================== Batch & Verify ====================

/// Batch API.
async fn batch(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<BatchRequest>,
) -> Result<Response, LfsApiError> {
    let response = state.lfs.process_batch(&id, caller.user(), req).await?;
    Ok(lfs_json(StatusCode::OK, response))
}

/// Confirms an upload.
async fn verify_object(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(spec): Json<ObjectSpec>,
) -> Result<Response, LfsApiError> {
    let object = state
        .lfs
        .verify_object(&id, caller.user(), &spec.oid, spec.size)
        .await?;
    Ok(lfs_json(StatusCode::OK, object))
}

// ==================== Locks ====================

/// Query parameters for listing locks.
#[derive(Debug, Default, Deserialize)]
pub struct ListLocksQuery {
    pub path: Option<String>,
    pub id: Option<LockId>,
    pub limit: Option<usize>,
}

/// Lists locks.
async fn list_locks(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Query(query): Query<ListLocksQuery>,
) -> Result<Response, LfsApiError> {
    let filter = LockFilter {
        path: query.path,
        id: query.id,
        limit: query.limit,
    };
    let locks = state.locks.list_locks(&id, caller.user(), &filter).await?;
    Ok(lfs_json(
        StatusCode::OK,
        LockList {
            locks: locks.iter().map(Lock::from).collect(),
        },
    ))
}

/// Creates a lock.
async fn create_lock(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<CreateLockRequest>,
) -> Result<Response, LfsApiError> {
    let user = caller.require()?;
    match state.locks.create_lock(&id, user, &req.path).await {
        Ok(lock) => Ok(lfs_json(
            StatusCode::CREATED,
            LockResponse {
                lock: Lock::from(&lock),
            },
        )),
        Err(LfsError::LockAlreadyExists(existing)) => Ok(lfs_json(
            StatusCode::CONFLICT,
            LockConflict {
                lock: Lock::from(existing.as_ref()),
                message: "already created lock".to_string(),
            },
        )),
        Err(e) => Err(e.into()),
    }
}

/// Splits locks into the caller's and everyone else's.
async fn verify_locks(
    State(state): State<AppState>,
    Path(id): Path<RepositoryId>,
    caller: Caller,
    Json(req): Json<VerifyLocksRequest>,
) -> Result<Response, LfsApiError> {
    let user = caller.require()?;
    let verification = state.locks.verify_locks(&id, user).await?;
    let limit = req.limit.unwrap_or(usize::MAX);
    Ok(lfs_json(
        StatusCode::OK,
        VerifyLocksResponse {
            ours: verification.ours.iter().take(limit).map(Lock::from).collect(),
            theirs: verification.theirs.iter().take(limit).map(Lock::from).collect(),
        },
    ))
}

/// Releases a lock.
async fn unlock(
    State(state): State<AppState>,
    Path((id, lock_id)): Path<(RepositoryId, LockId)>,
    caller: Caller,
    Json(req): Json<UnlockRequest>,
) -> Result<Response, LfsApiError> {
    let user = caller.require()?;
    let lock = state.locks.delete_lock(&id, &lock_id, user, req.force).await?;
    Ok(lfs_json(
        StatusCode::OK,
        LockResponse {
            lock: Lock::from(&lock),
        },
    ))
}

// ==================== Presigned Transfers ====================

/// Signature presented with a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferQuery {
    pub expires: i64,
    pub sig: String,
}

fn authorize_transfer(
    state: &AppState,
    oid: &str,
    operation: TransferOperation,
    query: &TransferQuery,
) -> Result<Oid, LfsApiError> {
    if !is_valid_oid(oid) {
        return Err(LfsError::InvalidOid(oid.to_string()).into());
    }
    let oid = Oid::from_hex(oid).map_err(|_| LfsError::InvalidOid(oid.to_string()))?;
    if !state.signer.verify(&oid, operation, query.expires, &query.sig) {
        return Err(ApiError::Auth(AuthError::AccessDenied(
            "invalid or expired signature".to_string(),
        ))
        .into());
    }
    Ok(oid)
}

/// Receives object bytes through a presigned upload URL.
async fn upload_object(
    State(state): State<AppState>,
    Path(oid): Path<String>,
    Query(query): Query<TransferQuery>,
    body: Bytes,
) -> Result<StatusCode, LfsApiError> {
    let oid = authorize_transfer(&state, &oid, TransferOperation::Upload, &query)?;
    let size = body.len();
    state.blobs.upload(&oid, body).await?;

    tracing::info!(%oid, size, "LFS object uploaded");
    Ok(StatusCode::OK)
}

/// Serves object bytes through a presigned download URL.
async fn download_object(
    State(state): State<AppState>,
    Path(oid): Path<String>,
    Query(query): Query<TransferQuery>,
) -> Result<Response, LfsApiError> {
    let oid = authorize_transfer(&state, &oid, TransferOperation::Download, &query)?;
    let data = state.blobs.download(&oid).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    )
        .into_response())
}
