use std::path::PathBuf;

use thiserror::Error;

use modhub_archive::ArchiveError;
use modhub_catalog::CatalogError;
use modhub_store::StoreError;
use modhub_types::TypeError;

#[derive(Debug, Error)]
pub enum PublishError {
    /// The uploaded archive cannot be opened or extracted.
    #[error("corrupt archive {path:?}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// The extracted tree does not match the declared manifest.
    #[error("manifest mismatch for {module}:{version}: {reason}")]
    ManifestMismatch {
        module: String,
        version: String,
        reason: String,
    },

    /// A config or manifest document is malformed or incomplete.
    #[error("cannot read {path:?}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    #[error("version already exists: {module}:{version}")]
    VersionExists { module: String, version: String },

    #[error("no such module: {module}{}", .version.as_deref().map(|v| format!(":{v}")).unwrap_or_default())]
    NoSuchModule {
        module: String,
        version: Option<String>,
    },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] TypeError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("job queue is closed")]
    QueueClosed,

    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking job task panicked or was cancelled.
    #[error("job task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArchiveError> for PublishError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::CorruptArchive { path, reason } => Self::CorruptArchive { path, reason },
            ArchiveError::UnsafeEntry { path, name } => Self::CorruptArchive {
                path,
                reason: format!("unsafe entry name {name}"),
            },
            ArchiveError::Io(e) => Self::Io(e),
            other => Self::Store(StoreError::Archive(other)),
        }
    }
}

impl From<StoreError> for PublishError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConfigRead { path, reason } => Self::ConfigRead { path, reason },
            StoreError::Archive(e) => e.into(),
            StoreError::InvalidIdentifier(e) => Self::InvalidIdentifier(e),
            StoreError::Io(e) => Self::Io(e),
            other => Self::Store(other),
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_corruption_maps_to_corrupt_archive() {
        let err: PublishError = ArchiveError::CorruptArchive {
            path: "up.zip".into(),
            reason: "bad header".into(),
        }
        .into();
        assert!(matches!(err, PublishError::CorruptArchive { .. }));

        let nested: PublishError = StoreError::Archive(ArchiveError::UnsafeEntry {
            path: "up.zip".into(),
            name: "../x".into(),
        })
        .into();
        assert!(matches!(nested, PublishError::CorruptArchive { .. }));
    }

    #[test]
    fn config_read_is_preserved() {
        let err: PublishError = StoreError::ConfigRead {
            path: "a.yml".into(),
            reason: "missing field `title`".into(),
        }
        .into();
        assert!(matches!(err, PublishError::ConfigRead { .. }));
    }

    #[test]
    fn no_such_module_display() {
        let all = PublishError::NoSuchModule { module: "annot".into(), version: None };
        assert_eq!(all.to_string(), "no such module: annot");
        let one = PublishError::NoSuchModule { module: "annot".into(), version: Some("1.0".into()) };
        assert_eq!(one.to_string(), "no such module: annot:1.0");
    }
}
