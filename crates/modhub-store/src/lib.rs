//! Versioned module store for modhub.
//!
//! The store is a plain directory tree; this crate knows where everything
//! lives in it and how to read one published version back.
//!
//! # Architecture
//!
//! - **PathLayout**: `(root, module, version)` to canonical paths
//! - **Documents**: the YAML files kept per version (`<name>.yml` config,
//!   `meta.yml`) and the upload manifest shipped with each archive
//! - **ModuleVersionRecord**: everything the catalog needs about one
//!   version, derived from files at layout locations
//!
//! All writes of structured documents are atomic (temp file plus rename).

pub mod conf;
pub mod document;
pub mod error;
pub mod layout;
pub mod meta;
pub mod record;
pub mod upload;

pub use conf::ModuleConf;
pub use document::{load_document, parse_document, write_atomic, write_document};
pub use error::{StoreError, StoreResult};
pub use layout::{ModuleTree, PathLayout, DATA_DIR};
pub use meta::{VersionMeta, PUBLISH_TIME_FORMAT};
pub use record::{ModuleVersionRecord, PublishTimeSource};
pub use upload::{ManifestNode, UploadManifest};
