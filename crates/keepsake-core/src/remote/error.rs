//! Remote store errors

use thiserror::Error;

/// Errors returned by a [`RemoteStore`](super::RemoteStore)
#[derive(Error, Debug)]
pub enum RemoteError {
    /// No blob exists at the location
    #[error("Remote state not found at '{location}'")]
    NotFound { location: String },

    /// Credential rejected or lacks permission
    #[error("Remote store rejected the credential (HTTP {status})")]
    Auth { status: u16 },

    /// Version token did not match the stored blob
    #[error("Remote state changed concurrently at '{location}': {details}")]
    Conflict { location: String, details: String },

    /// Transport failure or timeout
    #[error("Network error talking to remote store: {0}")]
    Network(#[source] reqwest::Error),

    /// Unexpected status or malformed response
    #[error("Unexpected response from remote store: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Whether this error means "nothing stored yet" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = RemoteError::NotFound {
            location: "octo/backups:maindb.json".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("octo/backups:maindb.json"));

        let err = RemoteError::Auth { status: 401 };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("401"));
    }
}
