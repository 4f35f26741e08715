use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive cannot be opened or one of its entries cannot be read.
    #[error("corrupt archive {path:?}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// An entry name would escape the extraction directory.
    #[error("unsafe entry name in {path:?}: {name}")]
    UnsafeEntry { path: PathBuf, name: String },

    /// A source path passed to the writer is not under its root.
    #[error("path {path:?} is outside archive root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Returns `true` if the failure is a problem with the archive bytes
    /// rather than with the local filesystem.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptArchive { .. } | Self::UnsafeEntry { .. })
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
