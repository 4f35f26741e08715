//! Store maintenance audits over version privacy.
//!
//! These only read each version's config, so they also work on modules the
//! manifest builder would skip for a broken archive.

use std::path::PathBuf;

use tracing::warn;

use modhub_store::{ModuleConf, PathLayout};
use modhub_types::{ModuleName, ModuleVersion};

use crate::error::CatalogResult;
use crate::scan::{module_names, version_dirs};

/// A private version directory found by an audit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateVersion {
    pub name: ModuleName,
    pub version: ModuleVersion,
    pub path: PathBuf,
}

/// Ascending `(version, private)` pairs for one module, or `None` if a
/// config could not be read.
fn privacy(layout: &PathLayout, name: &ModuleName) -> CatalogResult<Option<Vec<(ModuleVersion, bool)>>> {
    let mut out = Vec::new();
    for version in version_dirs(layout, name)? {
        match ModuleConf::load(&layout.conf(name, &version)) {
            Ok(conf) => out.push((version, conf.private)),
            Err(e) => {
                warn!(module = %name, version = %version, error = %e, "cannot read config, skipping module");
                return Ok(None);
            }
        }
    }
    Ok(Some(out))
}

/// Modules whose every version is private. They never appear in a manifest.
pub fn fully_private_modules(layout: &PathLayout) -> CatalogResult<Vec<ModuleName>> {
    let mut found = Vec::new();
    for name in module_names(layout)? {
        let Some(versions) = privacy(layout, &name)? else {
            continue;
        };
        if !versions.is_empty() && versions.iter().all(|(_, private)| *private) {
            found.push(name);
        }
    }
    Ok(found)
}

/// Private versions older than their module's highest version, for modules
/// whose highest version is public.
pub fn stale_private_versions(layout: &PathLayout) -> CatalogResult<Vec<PrivateVersion>> {
    let mut found = Vec::new();
    for name in module_names(layout)? {
        let Some(versions) = privacy(layout, &name)? else {
            continue;
        };
        let Some((_, latest_private)) = versions.last() else {
            continue;
        };
        if *latest_private {
            continue;
        }
        let stale = versions[..versions.len() - 1]
            .iter()
            .filter(|(_, private)| *private)
            .map(|(version, _)| PrivateVersion {
                path: layout.version_dir(&name, version),
                name: name.clone(),
                version: version.clone(),
            });
        found.extend(stale);
    }
    Ok(found)
}
