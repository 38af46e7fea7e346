//! Error types for fieldrep-core

use thiserror::Error;

/// Result type alias using fieldrep-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldrep-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local record store fault
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced report, draft, or remote document is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Draft has no title, details, or media
    #[error("Cannot save an empty draft")]
    EmptyDraft,

    /// Network or remote fault (offline, timeout, connection refused)
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote store rejected the request
    #[error("Remote store error: {0}")]
    Remote(String),

    /// No signed-in, non-guest user is available for sync
    #[error("No user ID available for sync")]
    NoSession,
}

impl Error {
    /// Whether the error is a local storage fault.
    ///
    /// Storage faults abort the user action that caused them.
    pub const fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::LibSql(_) | Self::Io(_) | Self::Serialization(_)
        )
    }

    /// Whether the error came from the remote side of a sync attempt.
    ///
    /// Remote faults never fail a user action; the operation is queued instead.
    pub const fn is_remote_fault(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::Remote(_) | Self::NoSession
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::RemoteUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_storage_and_remote_faults() {
        assert!(Error::Storage("disk full".into()).is_storage_fault());
        assert!(Error::Io(std::io::Error::other("boom")).is_storage_fault());
        assert!(!Error::NotFound("r1".into()).is_storage_fault());

        assert!(Error::RemoteUnavailable("offline".into()).is_remote_fault());
        assert!(Error::Remote("HTTP 500".into()).is_remote_fault());
        assert!(Error::NoSession.is_remote_fault());
        assert!(!Error::EmptyDraft.is_remote_fault());
    }
}
