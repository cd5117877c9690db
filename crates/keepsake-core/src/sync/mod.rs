//! State synchronization
//!
//! Keeps the local state file and its remote backup in step.
//!
//! ## Triggers
//!
//! 1. `restore` once, before the worker starts
//! 2. `push` on a fixed interval while the worker runs
//! 3. `push` once more when a termination signal arrives
//!
//! ## Usage
//!
//! ```ignore
//! let controller = Arc::new(SyncController::from_config(&config, remote));
//! controller.restore().await;
//! let periodic = spawn_periodic_push(Arc::clone(&controller), config.sync_interval());
//! ```

mod controller;
mod periodic;

pub use controller::{SkipReason, SyncController, SyncError, SyncOutcome};
pub use periodic::{spawn_periodic_push, PeriodicCommand, PeriodicSyncHandle};
