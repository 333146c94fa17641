//! Error types for p4watch-sync.

use thiserror::Error;

use p4watch_core::{ConfigError, DecodeError};

/// All errors that can arise from polling or syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection settings were incomplete or unreadable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server output could not be decoded into records or revisions.
    #[error("malformed output: {0}")]
    MalformedOutput(#[from] DecodeError),

    /// The client process could not be started, timed out, exited non-zero,
    /// or reported an error record. `command` has the password masked.
    #[error("`{command}` failed: {reason}")]
    RemoteExecution { command: String, reason: String },

    /// The tracked scope has no submitted changelists yet.
    #[error("no revisions found for {scope}")]
    NoRevisionsFound { scope: String },

    /// The caller-supplied output sink rejected a write.
    #[error("failed to write sync output: {0}")]
    Sink(#[source] std::io::Error),
}

/// Convenience constructor for [`SyncError::RemoteExecution`].
pub(crate) fn remote_err(command: &str, reason: impl Into<String>) -> SyncError {
    SyncError::RemoteExecution {
        command: command.to_owned(),
        reason: reason.into(),
    }
}
