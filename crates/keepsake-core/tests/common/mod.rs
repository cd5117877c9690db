//! Shared test doubles
//!
//! `MemoryRemote` behaves like the GitHub contents API: every write assigns
//! a new version token and an update with a stale token is a conflict.
//! `RecordingTarget` records when it was asked to terminate.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keepsake_core::remote::{
    RemoteBlob, RemoteError, RemoteLocation, RemoteResult, RemoteStore, SyncTarget, VersionToken,
};
use keepsake_core::shutdown::{ShutdownSignal, SignalTarget};
use keepsake_core::supervisor::SupervisorError;

pub fn target() -> SyncTarget {
    SyncTarget::new(
        "test-token",
        RemoteLocation::new("octo/backups", "maindb.json"),
    )
}

#[derive(Debug, Default)]
struct MemoryState {
    blob: Option<RemoteBlob>,
    next_version: u64,
    fetches: usize,
    writes: usize,
    messages: Vec<String>,
    /// Fail every fetch with an auth error
    reject_credential: bool,
    /// Someone else writes between our fetch and our write
    concurrent_writer: bool,
    write_delay: Option<Duration>,
    last_write_finished: Option<Instant>,
}

/// In-memory remote store with optimistic concurrency
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the remote with `content`
    pub fn with_blob(content: &[u8]) -> Self {
        let remote = Self::new();
        {
            let mut state = remote.state.lock().unwrap();
            state.next_version = 1;
            state.blob = Some(RemoteBlob {
                content: content.to_vec(),
                version: VersionToken::new("v1"),
            });
        }
        remote
    }

    pub fn reject_credential(&self) {
        self.state.lock().unwrap().reject_credential = true;
    }

    pub fn simulate_concurrent_writer(&self) {
        self.state.lock().unwrap().concurrent_writer = true;
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = Some(delay);
    }

    pub fn content(&self) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .blob
            .as_ref()
            .map(|b| b.content.clone())
    }

    pub fn version(&self) -> Option<VersionToken> {
        self.state
            .lock()
            .unwrap()
            .blob
            .as_ref()
            .map(|b| b.version.clone())
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn messages(&self) -> Vec<String> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn last_write_finished(&self) -> Option<Instant> {
        self.state.lock().unwrap().last_write_finished
    }

    fn bump(state: &mut MemoryState) -> VersionToken {
        state.next_version += 1;
        VersionToken::new(format!("v{}", state.next_version))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, target: &SyncTarget) -> RemoteResult<RemoteBlob> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;

        if state.reject_credential {
            return Err(RemoteError::Auth { status: 401 });
        }

        let blob = state.blob.clone().ok_or_else(|| RemoteError::NotFound {
            location: target.location().to_string(),
        })?;

        if state.concurrent_writer {
            let version = Self::bump(&mut state);
            if let Some(stored) = state.blob.as_mut() {
                stored.version = version;
            }
        }

        Ok(blob)
    }

    async fn write(
        &self,
        target: &SyncTarget,
        content: &[u8],
        version: Option<&VersionToken>,
        message: &str,
    ) -> RemoteResult<VersionToken> {
        let delay = self.state.lock().unwrap().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        state.messages.push(message.to_string());

        if state.reject_credential {
            return Err(RemoteError::Auth { status: 401 });
        }

        let current = state.blob.as_ref().map(|b| b.version.clone());
        if current.as_ref() != version {
            return Err(RemoteError::Conflict {
                location: target.location().to_string(),
                details: format!("expected {:?}, got {:?}", current, version),
            });
        }

        let new_version = Self::bump(&mut state);
        state.blob = Some(RemoteBlob {
            content: content.to_vec(),
            version: new_version.clone(),
        });
        state.last_write_finished = Some(Instant::now());

        Ok(new_version)
    }
}

/// Signal target that records each terminate call
#[derive(Debug, Default)]
pub struct RecordingTarget {
    calls: Mutex<Vec<(ShutdownSignal, Instant)>>,
}

impl RecordingTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(ShutdownSignal, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SignalTarget for RecordingTarget {
    fn terminate(&self, signal: ShutdownSignal) -> Result<(), SupervisorError> {
        self.calls.lock().unwrap().push((signal, Instant::now()));
        Ok(())
    }
}
