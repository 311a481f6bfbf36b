//! Error classification shared by all Depot crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a domain error.
///
/// Every crate-level error type exposes a `kind()` that maps into this enum,
/// so transport layers can pick a stable status code without matching on
/// crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A repository, pull request, lock or object is absent.
    NotFound,
    /// A unique key (such as an owner's slug) is already taken.
    AlreadyExists,
    /// Input failed validation.
    InvalidInput,
    /// The caller lacks the required permission.
    AccessDenied,
    /// The operation is reserved for the repository owner.
    NotOwner,
    /// The owner's storage quota is exhausted.
    QuotaExceeded,
    /// The entity is in a state that forbids the operation.
    Conflict,
    /// A storage, quota or persistence collaborator failed.
    Unavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::NotOwner => "not_owner",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display_matches_serde() {
        let kind = ErrorKind::QuotaExceeded;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{}\"", kind));
    }
}
