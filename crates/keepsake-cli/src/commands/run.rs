//! Supervisor command handler

use std::sync::Arc;

use anyhow::{Context, Result};

use keepsake_core::supervisor::WorkerCommand;
use keepsake_core::{Bootstrap, Config, GithubContentsClient};

/// Restore, run the worker, back up until it exits; returns the exit code
///
/// A non-empty `worker` replaces the configured worker command.
pub async fn run(config: Config, worker: Vec<String>) -> Result<i32> {
    let remote = GithubContentsClient::with_base_url(&config.api_url)
        .context("Failed to create GitHub client")?;

    let override_command = if worker.is_empty() {
        None
    } else {
        Some(WorkerCommand::from_argv(&worker)?.current_dir(&config.app_dir))
    };

    let mut bootstrap = Bootstrap::new(config, Arc::new(remote));
    if let Some(command) = override_command {
        bootstrap = bootstrap.with_worker_command(command);
    }

    bootstrap.run().await
}
