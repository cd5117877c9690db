//! keepsake CLI
//!
//! Supervises a worker process and keeps its state file backed up to a
//! GitHub repository.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keepsake_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding the log filter
const LOG_ENV: &str = "KEEPSAKE_LOG";

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "keepsake - Supervise a worker and back up its state to GitHub")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore state, run the worker, and back up until it exits (default)
    Run {
        /// Worker command line, replacing the configured one
        #[arg(last = true, value_name = "COMMAND")]
        worker: Vec<String>,
    },
    /// Download the remote copy over the local state file
    Restore,
    /// Upload the local state file once
    Push,
    /// Show sync status (configuration, local file, remote copy)
    Status,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    init_logging(&output);

    let code = match dispatch(cli, &output).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn dispatch(cli: Cli, output: &Output) -> Result<i32> {
    let config = Config::load_with_cli_override(cli.config.as_deref())?;

    match cli.command {
        None => commands::run::run(config, Vec::new()).await,
        Some(Commands::Run { worker }) => commands::run::run(config, worker).await,
        Some(Commands::Restore) => commands::sync::restore(&config, output).await,
        Some(Commands::Push) => commands::sync::push(&config, output).await,
        Some(Commands::Status) => {
            commands::status::show(&config, output).await?;
            Ok(0)
        }
        Some(Commands::Config { command }) => match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(&config, cli.config.as_deref(), output)?;
                Ok(0)
            }
        },
    }
}

/// Log to stderr; stdout belongs to the worker and to command output
fn init_logging(output: &Output) {
    let default_level = if output.is_quiet() { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
