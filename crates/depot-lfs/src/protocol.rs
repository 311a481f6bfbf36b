//! Git LFS wire types.
//!
//! Request and response bodies of the batch, verify and locking endpoints,
//! all exchanged as `application/vnd.git-lfs+json`.

use depot_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::LfsLock;

/// Batch operation requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Fetch objects.
    Download,
    /// Push objects.
    Upload,
}

/// A Git ref the request applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    /// Fully qualified ref name, e.g. `refs/heads/main`.
    pub name: String,
}

/// Batch API request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<Vec<String>>,
    pub objects: Vec<ObjectSpec>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,
}

/// An object named in a batch or verify request.
///
/// The oid is kept as text so a malformed id fails only its own entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub oid: String,
    pub size: u64,
}

/// Batch API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub transfer: String,
    pub objects: Vec<ObjectResponse>,
}

/// Per-object outcome of a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectResponse {
    pub oid: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<ObjectActions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectError>,
}

impl ObjectResponse {
    /// An entry carrying transfer actions.
    pub fn with_actions(spec: &ObjectSpec, actions: ObjectActions) -> Self {
        Self {
            oid: spec.oid.clone(),
            size: spec.size,
            authenticated: None,
            actions: Some(actions),
            error: None,
        }
    }

    /// An entry for an object the server already holds.
    pub fn present(spec: &ObjectSpec) -> Self {
        Self {
            oid: spec.oid.clone(),
            size: spec.size,
            authenticated: Some(true),
            actions: None,
            error: None,
        }
    }

    /// An entry that failed.
    pub fn failed(spec: &ObjectSpec, code: u16, message: impl Into<String>) -> Self {
        Self {
            oid: spec.oid.clone(),
            size: spec.size,
            authenticated: None,
            actions: None,
            error: Some(ObjectError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Transfer actions for one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Action>,
}

/// A single transfer action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HashMap<String, String>>,
    /// Seconds until `href` stops being accepted.
    pub expires_in: u64,
}

/// Per-object error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    pub code: u16,
    pub message: String,
}

/// Error body of every LFS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

// Locking

/// Owner of a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    pub name: String,
}

/// A lock as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: String,
    pub path: String,
    pub locked_at: Timestamp,
    pub owner: LockOwner,
}

impl From<&LfsLock> for Lock {
    fn from(lock: &LfsLock) -> Self {
        Self {
            id: lock.id.to_string(),
            path: lock.path.clone(),
            locked_at: lock.locked_at,
            owner: LockOwner {
                name: lock.owner.to_string(),
            },
        }
    }
}

/// `POST /locks` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLockRequest {
    pub path: String,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,
}

/// Body returned for a created or released lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockResponse {
    pub lock: Lock,
}

/// Body returned when the path is already locked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConflict {
    pub lock: Lock,
    pub message: String,
}

/// `GET /locks` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockList {
    pub locks: Vec<Lock>,
}

/// `POST /locks/verify` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyLocksRequest {
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// `POST /locks/verify` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyLocksResponse {
    pub ours: Vec<Lock>,
    pub theirs: Vec<Lock>,
}

/// `POST /locks/{id}/unlock` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub force: bool,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,
}
