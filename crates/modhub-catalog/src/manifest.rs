//! The manifest document served to clients, and a retrying reader for it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use modhub_store::{load_document, PathLayout};
use modhub_types::{ModuleName, ModuleVersion};

use crate::entry::DataVersions;
use crate::error::{CatalogError, CatalogResult};

const READ_ATTEMPTS: u32 = 5;
const READ_BACKOFF: Duration = Duration::from_millis(200);

/// One module's line in a manifest.
///
/// Descriptive fields come from the latest matching version. Field order
/// here is the order written to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub developer: Value,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub datasource: Option<Value>,
    pub hidden: bool,
    pub versions: Vec<ModuleVersion>,
    pub data_versions: DataVersions,
    pub latest_version: ModuleVersion,
    pub code_size: u64,
    /// Size of the data archive the latest version resolves to.
    pub data_size: u64,
    pub size: u64,
    pub publish_time: String,
    pub has_logo: bool,
    pub requires: Option<Vec<String>>,
    pub groups: Vec<String>,
    pub data_sources: BTreeMap<ModuleVersion, Option<Value>>,
    pub commercial_warning: Option<String>,
}

/// A full manifest: module name to entry, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub modules: BTreeMap<ModuleName, ManifestEntry>,
}

impl Manifest {
    pub fn get(&self, name: &ModuleName) -> Option<&ManifestEntry> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Published versions of `name`, empty if the module is not listed.
    pub fn current_versions(&self, name: &ModuleName) -> Vec<ModuleVersion> {
        self.get(name).map(|e| e.versions.clone()).unwrap_or_default()
    }

    pub fn latest_version(&self, name: &ModuleName) -> Option<&ModuleVersion> {
        self.get(name).map(|e| &e.latest_version)
    }

    /// Whether `name` is listed, and if `version` is given, whether that
    /// version is one of its published versions.
    pub fn module_exists(&self, name: &ModuleName, version: Option<&ModuleVersion>) -> bool {
        match (self.get(name), version) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(entry), Some(v)) => entry.versions.contains(v),
        }
    }
}

/// Reads the unscoped manifest the way an external consumer would.
///
/// A missing file is an empty manifest. A file that cannot be parsed is
/// retried a few times with a short sleep in between, since a reader may
/// race a rebuild.
#[derive(Clone, Debug)]
pub struct ManifestReader {
    path: PathBuf,
    attempts: u32,
    backoff: Duration,
}

impl ManifestReader {
    pub fn new(layout: &PathLayout) -> Self {
        Self::at(layout.manifest(None))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            attempts: READ_ATTEMPTS,
            backoff: READ_BACKOFF,
        }
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> CatalogResult<Manifest> {
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            if !self.path.exists() {
                return Ok(Manifest::default());
            }
            match load_document::<Option<Manifest>>(&self.path) {
                Ok(manifest) => return Ok(manifest.unwrap_or_default()),
                Err(e) => {
                    warn!(path = %self.path.display(), attempt, error = %e, "error reading manifest");
                    last_error = e.to_string();
                    if attempt < self.attempts {
                        std::thread::sleep(self.backoff);
                    }
                }
            }
        }
        Err(CatalogError::ManifestUnavailable {
            path: self.path.clone(),
            reason: last_error,
        })
    }

    pub fn current_versions(&self, name: &ModuleName) -> CatalogResult<Vec<ModuleVersion>> {
        Ok(self.read()?.current_versions(name))
    }

    pub fn latest_version(&self, name: &ModuleName) -> CatalogResult<Option<ModuleVersion>> {
        Ok(self.read()?.latest_version(name).cloned())
    }

    pub fn module_exists(&self, name: &ModuleName, version: Option<&ModuleVersion>) -> CatalogResult<bool> {
        Ok(self.read()?.module_exists(name, version))
    }
}
