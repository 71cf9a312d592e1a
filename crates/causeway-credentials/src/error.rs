// ABOUTME: Error types for the credentials store using thiserror.
// ABOUTME: Distinguishes corrupt documents from persistence failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or persisting credentials.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The credentials file exists but is not parseable TOML.
    #[error("the credentials file {path} is not valid TOML: {source}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    /// The credentials file parsed but has an unusable structure.
    #[error("the credentials file {path} is malformed: {reason}")]
    MalformedStore { path: PathBuf, reason: String },

    /// The credentials file exists but could not be read.
    #[error("failed to read the credentials file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credentials file could not be written; the previous file is
    /// left untouched.
    #[error("failed to write the credentials file {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No home directory to derive the default credentials path from.
    #[error("could not determine the home directory for the credentials file")]
    NoHomeDir,
}

/// Result type alias using StoreError.
pub type Result<T> = std::result::Result<T, StoreError>;
