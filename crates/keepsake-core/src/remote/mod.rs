//! Remote state store
//!
//! The backup copy of the state file lives in a hosted content store.
//! Every blob is addressed by a [`RemoteLocation`] and carries a
//! [`VersionToken`] that must be echoed back on update so a concurrent
//! change is never silently overwritten.
//!
//! ## Contract
//!
//! - `fetch` returns the current bytes and token, or an error that callers
//!   treat as "no remote state available".
//! - `write` creates the blob when no token is given, otherwise updates it.
//!   A stale token yields [`RemoteError::Conflict`].
//!
//! No retries happen at this layer; retry policy belongs to the caller.

mod error;
pub mod github;

use std::fmt;

use async_trait::async_trait;

pub use error::{RemoteError, RemoteResult};
pub use github::GithubContentsClient;

/// Opaque concurrency token assigned by the store (a git blob SHA on GitHub)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the backup lives: a repository and a path inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    repo: String,
    path: String,
}

impl RemoteLocation {
    pub fn new(repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            path: path.into().trim_start_matches('/').to_string(),
        }
    }

    /// Repository in `owner/name` form
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Path of the blob inside the repository
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.path)
    }
}

/// Everything needed to reach the backup: credential plus location
///
/// Only exists when sync is configured; its absence is the degraded mode.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncTarget {
    credential: String,
    location: RemoteLocation,
}

impl SyncTarget {
    pub fn new(credential: impl Into<String>, location: RemoteLocation) -> Self {
        Self {
            credential: credential.into(),
            location,
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn location(&self) -> &RemoteLocation {
        &self.location
    }
}

// Keep the credential out of logs and panic messages
impl fmt::Debug for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTarget")
            .field("credential", &"<redacted>")
            .field("location", &self.location)
            .finish()
    }
}

/// A blob as stored remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlob {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

/// Fetch/write access to the remote copy of the state file
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the blob and its current version token
    async fn fetch(&self, target: &SyncTarget) -> RemoteResult<RemoteBlob>;

    /// Create (`version == None`) or update the blob, returning the new token
    async fn write(
        &self,
        target: &SyncTarget,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> RemoteResult<VersionToken>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_strips_leading_slash() {
        let location = RemoteLocation::new("octo/backups", "/maindb.json");
        assert_eq!(location.path(), "maindb.json");
        assert_eq!(location.to_string(), "octo/backups:maindb.json");
    }

    #[test]
    fn test_sync_target_debug_hides_credential() {
        let target = SyncTarget::new(
            "ghp_verysecret",
            RemoteLocation::new("octo/backups", "maindb.json"),
        );
        let shown = format!("{:?}", target);
        assert!(!shown.contains("ghp_verysecret"));
        assert!(shown.contains("octo/backups"));
    }
}
