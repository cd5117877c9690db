//! Config command handlers

use std::path::Path;

use anyhow::{Context, Result};

use keepsake_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration (credential masked)
pub fn show(config: &Config, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let shown = config.redacted();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&shown).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.state_path().display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  app_dir:               {}", shown.app_dir.display());
            println!("  state_file:            {}", shown.state_file.display());
            println!(
                "  github_token:          {}",
                shown.github_token.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  github_repo:           {}",
                shown.github_repo.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  remote_path:           {}",
                shown
                    .remote_location()
                    .map(|l| l.path().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  api_url:               {}", shown.api_url);
            println!("  sync_interval_secs:    {}", shown.sync_interval_secs);
            println!("  shutdown_timeout_secs: {}", shown.shutdown_timeout_secs);
            println!("  commit_message:        {}", shown.commit_message);
            println!("  worker_command:        {}", shown.worker_command.join(" "));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}
