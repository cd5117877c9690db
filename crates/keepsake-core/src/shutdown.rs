//! Shutdown handling
//!
//! On SIGINT or SIGTERM the supervisor makes one last push, then forwards
//! the same signal to the worker. The push is bounded by a timeout and its
//! outcome never prevents the signal from being forwarded.
//!
//! ## Unix
//! SIGINT and SIGTERM are handled; no other signal is.
//!
//! ## Windows
//! Only Ctrl-C is awaited, reported as [`ShutdownSignal::Interrupt`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::supervisor::SupervisorError;
use crate::sync::{SyncController, SyncOutcome};

/// Termination signals the supervisor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
        }
    }

    #[cfg(unix)]
    pub fn as_nix(&self) -> nix::sys::signal::Signal {
        match self {
            ShutdownSignal::Interrupt => nix::sys::signal::Signal::SIGINT,
            ShutdownSignal::Terminate => nix::sys::signal::Signal::SIGTERM,
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can be asked to terminate with a signal
pub trait SignalTarget: Send + Sync {
    fn terminate(&self, signal: ShutdownSignal) -> Result<(), SupervisorError>;
}

impl<T: SignalTarget + ?Sized> SignalTarget for Arc<T> {
    fn terminate(&self, signal: ShutdownSignal) -> Result<(), SupervisorError> {
        (**self).terminate(signal)
    }
}

/// Bundles the sync controller and the worker for signal handling
pub struct ShutdownCoordinator<T> {
    controller: Arc<SyncController>,
    target: T,
    push_timeout: Duration,
}

impl<T: SignalTarget> ShutdownCoordinator<T> {
    pub fn new(controller: Arc<SyncController>, target: T, push_timeout: Duration) -> Self {
        Self {
            controller,
            target,
            push_timeout,
        }
    }

    /// Final push, then forward `signal` to the worker
    ///
    /// Returns the push outcome. The signal is forwarded whether the push
    /// succeeded, failed, or timed out.
    pub async fn handle(&self, signal: ShutdownSignal) -> SyncOutcome {
        info!(%signal, "Shutting down");

        let outcome = self.controller.push_with_timeout(self.push_timeout).await;
        info!(%outcome, "Final backup attempt finished");

        if let Err(e) = self.target.terminate(signal) {
            warn!(error = %e, "Failed to signal worker");
        }

        outcome
    }
}

/// Registered SIGINT/SIGTERM listeners
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Install the handlers
    ///
    /// From this point the default action (exit) no longer applies to these
    /// signals; they are delivered through [`recv`](Self::recv) instead.
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal
    ///
    /// Returns `None` once no more signals can be received.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|()| ShutdownSignal::Interrupt),
            received = self.terminate.recv() => received.map(|()| ShutdownSignal::Terminate),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|()| ShutdownSignal::Interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.name(), "SIGTERM");
    }

    #[cfg(unix)]
    #[test]
    fn test_nix_mapping() {
        use nix::sys::signal::Signal;
        assert_eq!(ShutdownSignal::Interrupt.as_nix(), Signal::SIGINT);
        assert_eq!(ShutdownSignal::Terminate.as_nix(), Signal::SIGTERM);
    }
}
