//! Status command handler

use anyhow::{Context, Result};

use keepsake_core::remote::RemoteStore;
use keepsake_core::storage::LocalStateStore;
use keepsake_core::{Config, GithubContentsClient};

use crate::output::{Output, OutputFormat};

/// What the remote store holds right now
enum RemoteStatus {
    Disabled,
    Present { version: String, size: usize },
    Unavailable(String),
}

/// Show sync configuration, local state, and the remote copy
pub async fn show(config: &Config, output: &Output) -> Result<()> {
    let local = LocalStateStore::new(config.state_path());
    let remote = remote_status(config).await?;
    let location = config.remote_location();

    match output.format {
        OutputFormat::Json => {
            let remote_json = match &remote {
                RemoteStatus::Disabled => serde_json::json!(null),
                RemoteStatus::Present { version, size } => {
                    serde_json::json!({"version": version, "size": size})
                }
                RemoteStatus::Unavailable(e) => serde_json::json!({"error": e}),
            };
            println!(
                "{}",
                serde_json::json!({
                    "sync_enabled": config.sync_target().is_some(),
                    "repo": location.as_ref().map(|l| l.repo().to_string()),
                    "remote_path": location.as_ref().map(|l| l.path().to_string()),
                    "state_file": local.path(),
                    "local": {
                        "exists": local.exists(),
                        "size": local.size()
                    },
                    "remote": remote_json,
                    "sync_interval_secs": config.sync_interval().as_secs(),
                    "worker_command": config.worker_command
                })
            );
        }
        OutputFormat::Quiet => {
            let enabled = config.sync_target().is_some();
            println!("{}", if enabled { "enabled" } else { "disabled" });
        }
        OutputFormat::Human => {
            println!("keepsake Status");
            println!("===============");
            println!();
            println!("Sync:");
            println!(
                "  Status:   {}",
                if config.sync_target().is_some() {
                    "enabled"
                } else {
                    "disabled (GitHub token or repository not set)"
                }
            );
            if let Some(ref location) = location {
                println!("  Repo:     {}", location.repo());
                println!("  Path:     {}", location.path());
            }
            println!("  Interval: {}s", config.sync_interval().as_secs());
            println!();
            println!("Local state:");
            println!("  File:     {}", local.path().display());
            match local.size() {
                Some(size) => println!("  Size:     {} bytes", size),
                None => println!("  Size:     (missing)"),
            }
            println!();
            println!("Remote state:");
            match remote {
                RemoteStatus::Disabled => println!("  (sync disabled)"),
                RemoteStatus::Present { version, size } => {
                    println!("  Version:  {}", version);
                    println!("  Size:     {} bytes", size);
                }
                RemoteStatus::Unavailable(e) => println!("  Unavailable: {}", e),
            }
            println!();
            println!("Worker:");
            println!("  Command:  {}", config.worker_command.join(" "));
        }
    }

    Ok(())
}

async fn remote_status(config: &Config) -> Result<RemoteStatus> {
    let Some(target) = config.sync_target() else {
        return Ok(RemoteStatus::Disabled);
    };

    let client = GithubContentsClient::with_base_url(&config.api_url)
        .context("Failed to create GitHub client")?;

    Ok(match client.fetch(&target).await {
        Ok(blob) => RemoteStatus::Present {
            version: blob.version.to_string(),
            size: blob.content.len(),
        },
        Err(e) => RemoteStatus::Unavailable(e.to_string()),
    })
}
