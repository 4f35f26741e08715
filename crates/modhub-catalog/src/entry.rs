use std::collections::BTreeMap;

use modhub_store::{ModuleVersionRecord, PathLayout, StoreResult};
use modhub_types::{ClientVersion, ModuleName, ModuleVersion};

use crate::error::{CatalogError, CatalogResult};
use crate::scan::version_dirs;

/// Version-to-data-version chain: each version maps to the version whose
/// data archive it uses, or `None` if no earlier version carries data.
pub type DataVersions = BTreeMap<ModuleVersion, Option<ModuleVersion>>;

/// All versions of one module, as found in the store.
///
/// Public and private versions are kept apart, each in ascending order.
/// Only public versions take part in listing and the data chain; a broken
/// private version still makes the module unreadable.
#[derive(Clone, Debug)]
pub struct ModuleCatalogEntry {
    name: ModuleName,
    records: BTreeMap<ModuleVersion, ModuleVersionRecord>,
    private: BTreeMap<ModuleVersion, ModuleVersionRecord>,
}

impl ModuleCatalogEntry {
    /// Read every version directory of `name`.
    ///
    /// Any version that fails to load fails the whole entry.
    pub fn load(layout: &PathLayout, name: &ModuleName) -> CatalogResult<Self> {
        let versions = version_dirs(layout, name)?;
        if versions.is_empty() {
            return Err(CatalogError::ModuleNotFound(name.to_string()));
        }
        let mut records = BTreeMap::new();
        let mut private = BTreeMap::new();
        for version in versions {
            let record = ModuleVersionRecord::load(layout, name, &version)?;
            if record.is_private() {
                private.insert(version, record);
            } else {
                records.insert(version, record);
            }
        }
        Ok(Self {
            name: name.clone(),
            records,
            private,
        })
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    /// Returns `true` if every version is private.
    pub fn is_fully_private(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, version: &ModuleVersion) -> Option<&ModuleVersionRecord> {
        self.records.get(version)
    }

    pub fn private_versions(&self) -> Vec<ModuleVersion> {
        self.private.keys().cloned().collect()
    }

    /// Public versions in ascending order, optionally limited to those whose
    /// client range admits `client`.
    pub fn versions(&self, client: Option<&ClientVersion>) -> Vec<ModuleVersion> {
        self.matching_records(client)
            .into_iter()
            .map(|r| r.version.clone())
            .collect()
    }

    /// Records behind [`versions`](Self::versions), same order.
    pub fn matching_records(&self, client: Option<&ClientVersion>) -> Vec<&ModuleVersionRecord> {
        self.records
            .values()
            .filter(|r| client.map_or(true, |c| r.client_requirement.matches(c)))
            .collect()
    }

    /// Resolve which version supplies the data for each of `versions`.
    ///
    /// `versions` must be ascending. A version with its own data archive maps
    /// to itself; otherwise it inherits the mapping of the version right
    /// before it in `versions`. Versions not in this entry map to `None`.
    pub fn data_versions(&self, versions: &[ModuleVersion]) -> DataVersions {
        let mut chain = DataVersions::new();
        let mut previous: Option<ModuleVersion> = None;
        for version in versions {
            let own = self.records.get(version).is_some_and(|r| r.has_data);
            let supplier = if own { Some(version.clone()) } else { previous.clone() };
            chain.insert(version.clone(), supplier.clone());
            previous = supplier;
        }
        chain
    }

    /// The highest public version.
    pub fn latest(&self) -> Option<&ModuleVersionRecord> {
        self.records.values().next_back()
    }

    /// Persist publish times that were derived from archive mtimes, for
    /// private versions as well as public ones.
    ///
    /// Returns the number of `meta.yml` files written.
    pub fn persist_publish_times(&mut self, layout: &PathLayout) -> StoreResult<usize> {
        let mut written = 0;
        for record in self.records.values_mut().chain(self.private.values_mut()) {
            if record.persist_publish_time(layout)? {
                written += 1;
            }
        }
        Ok(written)
    }
}
