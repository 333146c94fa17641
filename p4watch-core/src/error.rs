//! Error types for p4watch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required connection value was not supplied by file or flag.
    #[error("missing required configuration value: {field}")]
    MissingField { field: &'static str },

    /// Underlying I/O failure reading the settings file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and serde_yaml context.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,
}

/// Errors raised while decoding server output into records or revisions.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The tagged (`-G`) byte stream could not be decoded.
    #[error("invalid tagged stream at byte {offset}: {reason}")]
    Stream { offset: usize, reason: String },

    /// A record lacked a field the decoder requires.
    #[error("{operation} record is missing field '{field}'")]
    MissingField {
        operation: &'static str,
        field: String,
    },

    /// A field was present but its value could not be interpreted.
    #[error("{operation} record has invalid '{field}' value {value:?}")]
    InvalidField {
        operation: &'static str,
        field: String,
        value: String,
    },

    /// The server returned no records where at least one was required.
    #[error("{operation} returned no records")]
    Empty { operation: &'static str },
}

pub(crate) fn stream_err(offset: usize, reason: impl Into<String>) -> DecodeError {
    DecodeError::Stream {
        offset,
        reason: reason.into(),
    }
}
