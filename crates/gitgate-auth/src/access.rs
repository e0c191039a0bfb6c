//! Access levels and the access control contract.

use crate::{AuthError, PublicKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access a key holds on a repository.
///
/// Levels are not a threshold scale. Each git operation names the set of
/// levels it accepts, see [`AccessLevel::allows_fetch`] and
/// [`AccessLevel::allows_push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access at all.
    #[default]
    NoAccess,
    /// Can fetch, clone and download archives.
    ReadOnly,
    /// Can fetch and push.
    ReadWrite,
    /// Full control of the repository.
    Admin,
}

impl AccessLevel {
    /// Whether `git-upload-pack` and `git-upload-archive` are allowed.
    pub fn allows_fetch(&self) -> bool {
        matches!(
            self,
            AccessLevel::ReadOnly | AccessLevel::ReadWrite | AccessLevel::Admin
        )
    }

    /// Whether `git-receive-pack` is allowed.
    pub fn allows_push(&self) -> bool {
        matches!(self, AccessLevel::ReadWrite | AccessLevel::Admin)
    }
}

impl FromStr for AccessLevel {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "no-access" | "none" => Ok(AccessLevel::NoAccess),
            "read-only" | "read" => Ok(AccessLevel::ReadOnly),
            "read-write" | "write" | "push" => Ok(AccessLevel::ReadWrite),
            "admin" | "owner" => Ok(AccessLevel::Admin),
            _ => Err(AuthError::UnknownAccessLevel(s.to_string())),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::NoAccess => write!(f, "no-access"),
            AccessLevel::ReadOnly => write!(f, "read-only"),
            AccessLevel::ReadWrite => write!(f, "read-write"),
            AccessLevel::Admin => write!(f, "admin"),
        }
    }
}

/// Decides the access a client key has on a repository.
///
/// Called exactly once per git command, before anything touches disk.
/// Implementations may block on I/O; callers neither retry nor cache the
/// answer. Anonymous sessions pass `None` for the key.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Returns the access `key` has on `repo`.
    async fn auth_repo(&self, repo: &str, key: Option<&PublicKey>) -> AccessLevel;
}
