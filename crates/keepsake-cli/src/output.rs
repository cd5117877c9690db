//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Only one-shot commands print here. The supervisor itself reports through
//! the log, since the worker owns stdout.

use keepsake_core::sync::{SkipReason, SyncError, SyncOutcome};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Report the result of a one-shot restore or push
    pub fn sync_outcome(&self, operation: &str, outcome: &SyncOutcome) {
        match self.format {
            OutputFormat::Human => match outcome {
                SyncOutcome::Synced => println!("✓ {} complete", capitalize(operation)),
                SyncOutcome::Skipped(reason) => {
                    println!("{} skipped: {}", capitalize(operation), reason);
                    if *reason == SkipReason::SyncDisabled {
                        println!("  Set GH_TOKEN and GH_REPO (or github_token/github_repo in the config file).");
                    }
                }
                SyncOutcome::Failed(e) => {
                    println!("✗ {} failed: {}", capitalize(operation), e);
                    if let Some(hint) = failure_hint(outcome) {
                        println!("  {}", hint);
                    }
                }
            },
            OutputFormat::Json => {
                println!("{}", outcome_json(operation, outcome));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn outcome_json(operation: &str, outcome: &SyncOutcome) -> serde_json::Value {
    match outcome {
        SyncOutcome::Synced => serde_json::json!({
            "operation": operation,
            "status": "synced"
        }),
        SyncOutcome::Skipped(reason) => serde_json::json!({
            "operation": operation,
            "status": "skipped",
            "reason": reason.to_string()
        }),
        SyncOutcome::Failed(e) => serde_json::json!({
            "operation": operation,
            "status": "failed",
            "error": e.to_string(),
            "hint": failure_hint(outcome)
        }),
    }
}

/// Recovery hint for local file failures
fn failure_hint(outcome: &SyncOutcome) -> Option<&'static str> {
    match outcome {
        SyncOutcome::Failed(SyncError::Storage(e)) => e.recovery_suggestion(),
        _ => None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::StorageError;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_outcome_json() {
        let json = outcome_json("push", &SyncOutcome::Synced);
        assert_eq!(json["status"], "synced");

        let json = outcome_json("restore", &SyncOutcome::Skipped(SkipReason::SyncDisabled));
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "sync disabled");
    }

    #[test]
    fn test_failure_hint_for_storage_errors() {
        let denied = StorageError::from_write(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            PathBuf::from("/srv/app/maindb.json"),
        );
        let outcome = SyncOutcome::Failed(SyncError::Storage(denied));
        assert!(failure_hint(&outcome).is_some());

        let json = outcome_json("restore", &outcome);
        assert_eq!(json["status"], "failed");
        assert!(json["hint"].is_string());

        let timed_out = SyncOutcome::Failed(SyncError::TimedOut(Duration::from_secs(30)));
        assert!(failure_hint(&timed_out).is_none());
        assert!(outcome_json("push", &timed_out)["hint"].is_null());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("restore"), "Restore");
        assert_eq!(capitalize(""), "");
    }
}
