//! One-shot restore and push handlers

use std::sync::Arc;

use anyhow::{Context, Result};

use keepsake_core::sync::SyncOutcome;
use keepsake_core::{Config, GithubContentsClient, SyncController};

use crate::output::Output;

/// Pull the remote copy over the local state file
pub async fn restore(config: &Config, output: &Output) -> Result<i32> {
    let controller = controller(config)?;
    let outcome = controller.restore().await;
    output.sync_outcome("restore", &outcome);
    Ok(exit_code(&outcome))
}

/// Upload the local state file
pub async fn push(config: &Config, output: &Output) -> Result<i32> {
    let controller = controller(config)?;
    let outcome = controller.push().await;
    output.sync_outcome("push", &outcome);
    Ok(exit_code(&outcome))
}

fn controller(config: &Config) -> Result<SyncController> {
    let remote = GithubContentsClient::with_base_url(&config.api_url)
        .context("Failed to create GitHub client")?;
    Ok(SyncController::from_config(config, Arc::new(remote)))
}

/// Skipping is not a failure; only `Failed` exits non-zero
fn exit_code(outcome: &SyncOutcome) -> i32 {
    if outcome.is_failed() {
        1
    } else {
        0
    }
}
