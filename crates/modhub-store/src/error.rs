use std::path::PathBuf;

use modhub_archive::ArchiveError;
use modhub_types::TypeError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A structured document is malformed or lacks a required field.
    #[error("cannot read {path:?}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// A name or version found on disk or in a document is not valid.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] TypeError),

    /// A code or data archive in the store cannot be inspected.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Serializing a document for writing failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
