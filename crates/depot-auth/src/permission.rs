//! Permission levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AuthError;

/// Permission level for repository access.
///
/// Permissions are ordered: Read < Write < Admin. Names parse without
/// regard to case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Permission {
    /// Can read repository contents (clone, pull, download LFS objects).
    #[default]
    Read,
    /// Can read and write (push commits, upload LFS objects, lock files).
    Write,
    /// Full control including settings and force-unlocking.
    Admin,
}

impl Permission {
    /// Numeric level: read 1, write 2, admin 3.
    pub const fn level(&self) -> u8 {
        match self {
            Permission::Read => 1,
            Permission::Write => 2,
            Permission::Admin => 3,
        }
    }

    /// Check if this permission level grants at least the required level.
    pub fn has(&self, required: Permission) -> bool {
        self.level() >= required.level()
    }
}

impl FromStr for Permission {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "admin" => Ok(Permission::Admin),
            _ => Err(AuthError::InvalidPermission(s.to_string())),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = AuthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Read => write!(f, "read"),
            Permission::Write => write!(f, "write"),
            Permission::Admin => write!(f, "admin"),
        }
    }
}
