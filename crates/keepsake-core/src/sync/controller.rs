//! Sync controller
//!
//! Moves the state file between disk and the remote store:
//!
//! - `restore` pulls the remote copy over the local file before the worker
//!   starts.
//! - `push` uploads the local file, fetching the current version token right
//!   before the write.
//!
//! Every failure is logged and reported as [`SyncOutcome::Failed`]; nothing
//! here can abort the process or keep the worker from running.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::remote::{RemoteError, RemoteStore, SyncTarget, VersionToken};
use crate::storage::{LocalStateStore, StorageError};

/// Why a sync operation did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Credential or remote location missing
    SyncDisabled,
    /// Nothing on disk to push yet
    NoLocalState,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SyncDisabled => f.write_str("sync disabled"),
            SkipReason::NoLocalState => f.write_str("no local state"),
        }
    }
}

/// Errors absorbed at the controller boundary
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Push did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Result of a restore or push
#[derive(Debug)]
pub enum SyncOutcome {
    Synced,
    Skipped(SkipReason),
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Synced => f.write_str("synced"),
            SyncOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            SyncOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Orchestrates restore and push between [`LocalStateStore`] and a [`RemoteStore`]
pub struct SyncController {
    /// `None` disables sync entirely
    target: Option<SyncTarget>,
    remote: Arc<dyn RemoteStore>,
    local: LocalStateStore,
    /// Commit message prefix
    message_prefix: String,
    /// Held for the duration of every transfer so pushes never overlap
    transfer_lock: Mutex<()>,
}

impl SyncController {
    pub fn new(
        target: Option<SyncTarget>,
        remote: Arc<dyn RemoteStore>,
        local: LocalStateStore,
    ) -> Self {
        Self {
            target,
            remote,
            local,
            message_prefix: "keepsake auto-backup".to_string(),
            transfer_lock: Mutex::new(()),
        }
    }

    /// Build a controller from the application configuration
    pub fn from_config(config: &Config, remote: Arc<dyn RemoteStore>) -> Self {
        Self::new(
            config.sync_target(),
            remote,
            LocalStateStore::new(config.state_path()),
        )
        .with_message_prefix(config.commit_message.clone())
    }

    pub fn with_message_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.message_prefix = prefix.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&SyncTarget> {
        self.target.as_ref()
    }

    pub fn local(&self) -> &LocalStateStore {
        &self.local
    }

    /// Overwrite local state with the remote copy
    ///
    /// A missing or unreachable remote leaves local state untouched and is
    /// reported as `Failed`; callers carry on with whatever is on disk.
    pub async fn restore(&self) -> SyncOutcome {
        let Some(target) = &self.target else {
            info!("GitHub token or repository not set, skipping restore");
            return SyncOutcome::Skipped(SkipReason::SyncDisabled);
        };

        let _transfer = self.transfer_lock.lock().await;
        info!(location = %target.location(), "Restoring state from remote");

        let blob = match self.remote.fetch(target).await {
            Ok(blob) => blob,
            Err(e) => {
                if e.is_not_found() {
                    info!("No remote state found, starting fresh");
                } else {
                    warn!(error = %e, "Remote state unavailable, starting fresh");
                }
                return SyncOutcome::Failed(e.into());
            }
        };

        if let Err(e) = self.local.write(&blob.content) {
            warn!(
                error = %e,
                path = %self.local.path().display(),
                "Failed to write restored state"
            );
            return SyncOutcome::Failed(e.into());
        }

        info!(
            bytes = blob.content.len(),
            version = %blob.version,
            "State restored"
        );
        SyncOutcome::Synced
    }

    /// Upload local state to the remote store
    pub async fn push(&self) -> SyncOutcome {
        let Some(target) = &self.target else {
            debug!("Sync disabled, skipping push");
            return SyncOutcome::Skipped(SkipReason::SyncDisabled);
        };

        let _transfer = self.transfer_lock.lock().await;

        let content = match self.local.read() {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                debug!(path = %self.local.path().display(), "No local state yet, skipping push");
                return SyncOutcome::Skipped(SkipReason::NoLocalState);
            }
            Err(e) => {
                warn!(error = %e, "Backup failed: could not read local state");
                return SyncOutcome::Failed(e.into());
            }
        };

        let version = self.current_version(target).await;
        let message = self.commit_message();

        match self
            .remote
            .write(target, &content, version.as_ref(), &message)
            .await
        {
            Ok(new_version) => {
                info!(
                    bytes = content.len(),
                    version = %new_version,
                    "State backed up"
                );
                SyncOutcome::Synced
            }
            Err(e) => {
                warn!(error = %e, "Backup failed");
                SyncOutcome::Failed(e.into())
            }
        }
    }

    /// One push attempt bounded by `limit`
    ///
    /// The limit includes time spent waiting for an in-flight push to finish.
    pub async fn push_with_timeout(&self, limit: Duration) -> SyncOutcome {
        match tokio::time::timeout(limit, self.push()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout = ?limit, "Backup timed out");
                SyncOutcome::Failed(SyncError::TimedOut(limit))
            }
        }
    }

    /// Token of the blob currently stored, or `None` to create a new one
    async fn current_version(&self, target: &SyncTarget) -> Option<VersionToken> {
        match self.remote.fetch(target).await {
            Ok(blob) => Some(blob.version),
            Err(e) if e.is_not_found() => {
                debug!("No remote state yet, creating it");
                None
            }
            Err(e) => {
                debug!(error = %e, "Could not read current remote version, writing without one");
                None
            }
        }
    }

    fn commit_message(&self) -> String {
        format!(
            "{} {}",
            self.message_prefix,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::GithubContentsClient;
    use tempfile::TempDir;

    fn disabled_controller(temp_dir: &TempDir) -> SyncController {
        let remote = GithubContentsClient::with_base_url("http://127.0.0.1:9").unwrap();
        SyncController::new(
            None,
            Arc::new(remote),
            LocalStateStore::new(temp_dir.path().join("maindb.json")),
        )
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SyncOutcome::Synced.to_string(), "synced");
        assert_eq!(
            SyncOutcome::Skipped(SkipReason::NoLocalState).to_string(),
            "skipped (no local state)"
        );
        let failed = SyncOutcome::Failed(SyncError::TimedOut(Duration::from_secs(30)));
        assert!(failed.is_failed());
        assert!(failed.to_string().contains("30s"));
    }

    #[test]
    fn test_commit_message_has_prefix_and_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let controller = disabled_controller(&temp_dir).with_message_prefix("nightly backup");

        let message = controller.commit_message();
        assert!(message.starts_with("nightly backup "));
        assert!(message.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_disabled_controller_skips_without_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        let controller = disabled_controller(&temp_dir);
        assert!(!controller.is_enabled());

        let restored = controller.restore().await;
        assert!(matches!(
            restored,
            SyncOutcome::Skipped(SkipReason::SyncDisabled)
        ));

        controller.local().write(b"{}").unwrap();
        let pushed = controller.push().await;
        assert!(matches!(pushed, SyncOutcome::Skipped(SkipReason::SyncDisabled)));
        assert_eq!(controller.local().read().unwrap(), b"{}");
    }
}
