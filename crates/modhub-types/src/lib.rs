//! Foundation types for modhub.
//!
//! Every other modhub crate depends on `modhub-types`. The types here are
//! pure values: they validate and order, but never touch the filesystem.
//!
//! # Key Types
//!
//! - [`ModuleName`]: validated module identifier, safe to use as a path component
//! - [`ModuleVersion`]: loosely-ordered version string (`1.0` < `1.0.1` < `1.10`)
//! - [`ClientVersion`]: a client release that manifests are bucketed by
//! - [`ClientRequirement`]: the range expression a module declares for clients

pub mod client;
pub mod error;
pub mod name;
pub mod version;

pub use client::{ClientRequirement, ClientVersion};
pub use error::TypeError;
pub use name::ModuleName;
pub use version::ModuleVersion;
