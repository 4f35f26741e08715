//! Directory scans over the store.
//!
//! Entries whose names are not valid module names or versions (temp files,
//! `.pending`, editor droppings) are skipped, not reported as errors.

use modhub_archive::list_directory;
use modhub_store::PathLayout;
use modhub_types::{ModuleName, ModuleVersion};
use tracing::debug;

use crate::error::CatalogResult;

/// Every module directory under the store, sorted by name.
///
/// A store without a `modules/` directory yet has no modules.
pub fn module_names(layout: &PathLayout) -> CatalogResult<Vec<ModuleName>> {
    let dir = layout.modules_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for (item, path) in list_directory(&dir)? {
        if !path.is_dir() {
            continue;
        }
        match ModuleName::parse(&item) {
            Ok(name) => names.push(name),
            Err(e) => debug!(entry = %item, error = %e, "skipping non-module directory"),
        }
    }
    Ok(names)
}

/// Every version directory of `name`, in ascending version order.
pub fn version_dirs(layout: &PathLayout, name: &ModuleName) -> CatalogResult<Vec<ModuleVersion>> {
    let dir = layout.module_dir(name);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut versions = Vec::new();
    for (item, path) in list_directory(&dir)? {
        if !path.is_dir() {
            continue;
        }
        match ModuleVersion::parse(&item) {
            Ok(version) => versions.push(version),
            Err(e) => debug!(module = %name, entry = %item, error = %e, "skipping non-version directory"),
        }
    }
    versions.sort();
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path().join("nowhere"));
        assert!(module_names(&layout).unwrap().is_empty());
    }

    #[test]
    fn skips_junk_and_sorts_versions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let name = ModuleName::parse("annot").unwrap();
        let mdir = layout.module_dir(&name);
        for v in ["1.10", "1.2", "1.0", ".tmp123"] {
            std::fs::create_dir_all(mdir.join(v)).unwrap();
        }
        std::fs::write(mdir.join("stray.txt"), b"").unwrap();
        std::fs::create_dir_all(layout.modules_dir().join(".hidden")).unwrap();

        assert_eq!(module_names(&layout).unwrap(), vec![name.clone()]);
        let versions: Vec<String> = version_dirs(&layout, &name)
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(versions, vec!["1.0", "1.2", "1.10"]);
    }
}
