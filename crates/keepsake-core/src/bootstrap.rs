//! Top-level sequencing
//!
//! 1. Restore state from the remote store (awaited, failure is not fatal)
//! 2. Start the worker
//! 3. Start the periodic push
//! 4. Handle SIGINT/SIGTERM: final push, then forward the signal
//!
//! Returns the exit code the host process should use: the worker's own
//! code, or [`SPAWN_FAILURE_EXIT_CODE`] if the worker could not be started.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::remote::RemoteStore;
use crate::shutdown::{ShutdownCoordinator, ShutdownSignals};
use crate::supervisor::{
    ProcessSupervisor, WorkerCommand, WorkerExit, SPAWN_FAILURE_EXIT_CODE,
};
use crate::sync::{spawn_periodic_push, SyncController};

/// Runs the restore → start → periodic push → shutdown pipeline
pub struct Bootstrap {
    config: Config,
    controller: Arc<SyncController>,
    command: Option<WorkerCommand>,
}

impl Bootstrap {
    pub fn new(config: Config, remote: Arc<dyn RemoteStore>) -> Self {
        let controller = Arc::new(SyncController::from_config(&config, remote));
        Self {
            config,
            controller,
            command: None,
        }
    }

    /// Run this command instead of the configured `worker_command`
    pub fn with_worker_command(mut self, command: WorkerCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn controller(&self) -> &Arc<SyncController> {
        &self.controller
    }

    /// Run until the worker exits; returns the host exit code
    ///
    /// Errors are limited to setup failures before the worker starts: an
    /// empty worker command, or signal handlers that cannot be installed.
    pub async fn run(self) -> Result<i32> {
        let command = match self.command {
            Some(command) => command,
            None => WorkerCommand::from_config(&self.config)?,
        };

        // 1. Restore
        let restored = self.controller.restore().await;
        info!(outcome = %restored, "Restore finished");

        // Handlers must be live before the worker is spawned
        let mut signals = ShutdownSignals::register().context("Failed to install signal handlers")?;

        // 2. Start worker
        let mut supervisor = ProcessSupervisor::new(command);
        let worker = match supervisor.start() {
            Ok(worker) => worker,
            Err(e) => {
                error!(error = %e, "Worker error");
                return Ok(SPAWN_FAILURE_EXIT_CODE);
            }
        };

        // 3. Periodic push
        let periodic =
            spawn_periodic_push(Arc::clone(&self.controller), self.config.sync_interval());

        // 4. Signal handling
        let coordinator = ShutdownCoordinator::new(
            Arc::clone(&self.controller),
            worker,
            self.config.shutdown_timeout(),
        );

        let exit = loop {
            tokio::select! {
                result = supervisor.wait() => break result,
                Some(signal) = signals.recv() => {
                    coordinator.handle(signal).await;
                }
            }
        };

        periodic.shutdown(self.config.shutdown_timeout()).await;

        let exit = match exit {
            Ok(exit) => exit,
            Err(e) => {
                error!(error = %e, "Lost track of worker");
                return Ok(SPAWN_FAILURE_EXIT_CODE);
            }
        };

        match exit {
            WorkerExit::Exited(0) => info!("Worker stopped"),
            WorkerExit::Exited(code) => error!(code, "Worker exited with code {}", code),
            WorkerExit::Killed(signal) => warn!(signal, "Worker killed by signal {}", signal),
        }

        Ok(exit.exit_code())
    }
}
