//! Catalog layer for modhub.
//!
//! Turns the store into the manifests clients read. A module's versions are
//! gathered into a [`ModuleCatalogEntry`], which filters them by client
//! version and resolves the data-version chain; [`ManifestBuilder`] renders
//! every entry into one manifest per client-version bucket.
//!
//! # Key Types
//!
//! - [`ModuleCatalogEntry`] -- public versions of one module, ascending
//! - [`ManifestBuilder`] -- full, atomic rebuild of every manifest
//! - [`Manifest`] / [`ManifestEntry`] -- the document written per bucket
//! - [`ManifestReader`] -- retrying reader for the unscoped manifest

pub mod audit;
pub mod builder;
pub mod entry;
pub mod error;
pub mod manifest;
pub mod scan;

#[cfg(test)]
pub(crate) mod testutil;

pub use audit::{fully_private_modules, stale_private_versions, PrivateVersion};
pub use builder::{manifest_for, BucketReport, BuildReport, ManifestBuilder};
pub use entry::{DataVersions, ModuleCatalogEntry};
pub use error::{CatalogError, CatalogResult};
pub use manifest::{Manifest, ManifestEntry, ManifestReader};
pub use scan::{module_names, version_dirs};
