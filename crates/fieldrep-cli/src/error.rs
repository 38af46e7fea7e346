use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldrep_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("ID cannot be empty")]
    EmptyId,
    #[error("Report not found for id/prefix: {0}")]
    ReportNotFound(String),
    #[error("Draft not found for id/prefix: {0}")]
    DraftNotFound(String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Nothing to change; pass at least one field flag")]
    EmptyEdit,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set remote_base_url in the config file or FIELDREP_REMOTE_URL."
    )]
    SyncNotConfigured,
    #[error("Signed in as guest; run `fieldrep login <uid>` to sync reports")]
    GuestSession,
}
