//! Error types for the catalog crate.

use modhub_archive::ArchiveError;
use modhub_store::StoreError;
use modhub_types::TypeError;

/// Errors that can occur while reading the store or building manifests.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Reading a version from the store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A module name or version is not valid.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] TypeError),

    /// The module has no version directories at all.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// A manifest could not be read after every retry.
    #[error("manifest unavailable at {path:?}: {reason}")]
    ManifestUnavailable {
        path: std::path::PathBuf,
        reason: String,
    },

    /// I/O error while walking the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArchiveError> for CatalogError {
    fn from(err: ArchiveError) -> Self {
        Self::Store(StoreError::Archive(err))
    }
}

/// Convenience alias for catalog results.
pub type CatalogResult<T> = Result<T, CatalogError>;
