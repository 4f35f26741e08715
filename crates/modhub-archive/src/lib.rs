//! Module archive codec for modhub.
//!
//! Uploaded modules and the code/data payloads served to clients are zip
//! archives. This crate hides the zip format behind a small surface:
//!
//! - **ArchiveWriter**: builds an archive from a directory, optionally
//!   leaving out subtrees (the code archive skips `data/`) or taking only one
//!   subtree (the data archive)
//! - **ArchiveReader**: extracts an archive safely and reports its total
//!   uncompressed size
//! - **list_directory / clear_directory**: the directory helpers the publish
//!   pipeline uses around extraction
//!
//! Malformed archives surface as [`ArchiveError::CorruptArchive`]; callers
//! treat that as a failed job, never as a fatal error.

pub mod error;
pub mod listing;
pub mod reader;
pub mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use listing::{clear_directory, list_directory};
pub use reader::{extract_all, total_uncompressed_size, ArchiveReader};
pub use writer::{ArchiveFile, ArchiveWriter};
