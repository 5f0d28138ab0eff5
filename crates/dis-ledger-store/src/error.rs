//! Error types for the store module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written, appended or moved.
    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key directory is unreadable or unwritable.
    #[error("key store I/O error for {actor}: {source}")]
    KeyStore {
        actor: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored key material does not decode to the expected sizes.
    #[error("corrupt key for {actor}: {reason}")]
    CorruptKey { actor: String, reason: String },

    /// Name would escape its directory or is otherwise unusable as a file name.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Entry not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Receipt serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Last-verification marker is unreadable.
    #[error("invalid verification marker: {0}")]
    Marker(String),
}

impl From<dis_ledger_core::CoreError> for StoreError {
    fn from(e: dis_ledger_core::CoreError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
