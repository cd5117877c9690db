//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/keepsake/config.toml)
//! 3. Environment variables (KEEPSAKE_* prefix, plus GH_TOKEN / GH_REPO)
//!
//! Environment variables take precedence over config file values.
//! The sync cadence and shutdown timeout are file-only settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::remote::{RemoteLocation, SyncTarget};

/// Environment variable prefix
const ENV_PREFIX: &str = "KEEPSAKE";

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default state file name, relative to the application directory
pub const DEFAULT_STATE_FILE: &str = "maindb.json";

/// Five minutes between automatic pushes
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5 * 60;

/// Upper bound on the final push during shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application root: worker working directory and base for `state_file`
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    /// State file, relative to `app_dir` unless absolute
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// GitHub token used for the contents API
    #[serde(default)]
    pub github_token: Option<String>,

    /// Repository holding the backup, as `owner/name`
    #[serde(default)]
    pub github_repo: Option<String>,

    /// Path of the blob inside the repository (defaults to the state file name)
    #[serde(default)]
    pub remote_path: Option<String>,

    /// Base URL of the GitHub API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Seconds between automatic pushes
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Seconds allowed for the final push on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Commit message prefix; a UTC timestamp is appended on every push
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Worker command line (program followed by arguments)
    #[serde(default = "default_worker_command")]
    pub worker_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            state_file: default_state_file(),
            github_token: None,
            github_repo: None,
            remote_path: None,
            api_url: default_api_url(),
            sync_interval_secs: default_sync_interval_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            commit_message: default_commit_message(),
            worker_command: default_worker_command(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (~/.config/keepsake/config.toml or KEEPSAKE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path` when given on the command line, else the default location
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_var("APP_DIR") {
            self.app_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("STATE_FILE") {
            self.state_file = PathBuf::from(val);
        }

        // KEEPSAKE_GITHUB_TOKEN, falling back to GH_TOKEN
        if let Some(val) = env_var("GITHUB_TOKEN").or_else(|| std::env::var("GH_TOKEN").ok()) {
            self.github_token = non_empty(val);
        }

        // KEEPSAKE_GITHUB_REPO, falling back to GH_REPO
        if let Some(val) = env_var("GITHUB_REPO").or_else(|| std::env::var("GH_REPO").ok()) {
            self.github_repo = non_empty(val);
        }

        if let Some(val) = env_var("REMOTE_PATH") {
            self.remote_path = non_empty(val);
        }

        if let Some(val) = env_var("API_URL") {
            if !val.is_empty() {
                self.api_url = val;
            }
        }
    }

    /// Get the config file path
    ///
    /// Can be overridden with KEEPSAKE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keepsake")
            .join("config.toml")
    }

    /// Full path of the local state file
    pub fn state_path(&self) -> PathBuf {
        self.app_dir.join(&self.state_file)
    }

    /// Remote location of the backup, if a repository is configured
    pub fn remote_location(&self) -> Option<RemoteLocation> {
        let repo = self.github_repo.as_deref().filter(|r| !r.is_empty())?;
        let path = self
            .remote_path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.default_remote_path());
        Some(RemoteLocation::new(repo, path))
    }

    /// Credential and location, or `None` when sync is disabled
    pub fn sync_target(&self) -> Option<SyncTarget> {
        let token = self.github_token.as_deref().filter(|t| !t.is_empty())?;
        let location = self.remote_location()?;
        Some(SyncTarget::new(token, location))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Copy of the configuration safe for display (token masked)
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.github_token.is_some() {
            shown.github_token = Some("********".to_string());
        }
        shown
    }

    fn default_remote_path(&self) -> String {
        self.state_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string())
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

fn default_app_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_commit_message() -> String {
    "keepsake auto-backup".to_string()
}

fn default_worker_command() -> Vec<String> {
    vec!["node".to_string(), "server/init.js".to_string()]
}
