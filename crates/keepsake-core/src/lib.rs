//! keepsake core library
//!
//! keepsake supervises a single worker process and keeps the worker's state
//! file backed up in a GitHub repository.
//!
//! # Architecture
//!
//! - **Local state file**: the worker's source of truth
//! - **Remote store**: a backup copy, restored before the worker starts and
//!   pushed periodically and on shutdown
//!
//! Remote failures never stop the worker; they are logged and skipped.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let remote = Arc::new(GithubContentsClient::with_base_url(&config.api_url)?);
//! let code = Bootstrap::new(config, remote).run().await?;
//! std::process::exit(code);
//! ```
//!
//! # Modules
//!
//! - `bootstrap`: restore → start → periodic push → shutdown pipeline
//! - `config`: Application configuration
//! - `remote`: Remote store contract and the GitHub contents client
//! - `storage`: Local state file
//! - `sync`: Restore/push controller and the periodic task
//! - `supervisor`: Worker process lifecycle
//! - `shutdown`: Signal handling

pub mod bootstrap;
pub mod config;
pub mod remote;
pub mod shutdown;
pub mod storage;
pub mod supervisor;
pub mod sync;

pub use bootstrap::Bootstrap;
pub use config::Config;
pub use remote::{GithubContentsClient, RemoteError, RemoteStore, SyncTarget};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal, SignalTarget};
pub use storage::{LocalStateStore, StorageError};
pub use supervisor::{ProcessSupervisor, WorkerCommand, WorkerExit};
pub use sync::{SyncController, SyncOutcome};
