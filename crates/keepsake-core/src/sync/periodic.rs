//! Periodic push task
//!
//! A background task that pushes local state every interval. The first push
//! happens one full interval after the task starts, never immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::controller::SyncController;

/// Commands sent to the periodic task
#[derive(Debug)]
pub enum PeriodicCommand {
    /// Stop once any in-flight push completes
    Shutdown,
}

/// Handle for controlling the periodic push task
pub struct PeriodicSyncHandle {
    command_tx: mpsc::Sender<PeriodicCommand>,
    task: JoinHandle<()>,
}

impl PeriodicSyncHandle {
    /// Stop the task, giving an in-flight push at most `grace` to finish
    ///
    /// A push still running after `grace` is aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.command_tx.send(PeriodicCommand::Shutdown).await;

        if time::timeout(grace, &mut self.task).await.is_err() {
            warn!(grace = ?grace, "Periodic backup still running, aborting it");
            self.task.abort();
        }
    }
}

/// Spawn a task that calls [`SyncController::push`] every `interval`
pub fn spawn_periodic_push(controller: Arc<SyncController>, interval: Duration) -> PeriodicSyncHandle {
    let (command_tx, command_rx) = mpsc::channel(4);
    let task = tokio::spawn(periodic_push_task(controller, interval, command_rx));

    PeriodicSyncHandle { command_tx, task }
}

async fn periodic_push_task(
    controller: Arc<SyncController>,
    interval: Duration,
    mut command_rx: mpsc::Receiver<PeriodicCommand>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    // A slow push delays the next tick instead of causing a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?interval, "Periodic backup scheduled");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = controller.push().await;
                debug!(%outcome, "Periodic backup finished");
            }
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(PeriodicCommand::Shutdown) | None) {
                    break;
                }
            }
        }
    }

    debug!("Periodic backup stopped");
}
