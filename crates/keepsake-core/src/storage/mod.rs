//! Storage layer
//!
//! Handles the local state file: the worker's source of truth and the
//! thing that gets backed up.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::LocalStateStore;
