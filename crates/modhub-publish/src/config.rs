use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use modhub_store::PathLayout;
use modhub_types::{ClientVersion, ModuleName, ModuleVersion};

use crate::error::{PublishError, PublishResult};

/// Environment variable naming the worker's TOML config file.
pub const CONFIG_ENV: &str = "MODHUB_CONFIG";

/// Settings for the publish worker and everything it constructs.
///
/// ```toml
/// store_root = "/srv/modhub/store"
/// temp_dir = "/srv/modhub/tmp"
/// uploads_dir = "/srv/modhub/uploads"
/// client_versions = ["1.8.0", "2.0.0"]
/// poll_interval_ms = 2000
/// queue_capacity = 256
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Root of the published store (`modules/` and the manifests).
    pub store_root: PathBuf,
    /// Where uploads are extracted and verified.
    pub temp_dir: PathBuf,
    /// Where the submission layer writes raw uploads.
    pub uploads_dir: PathBuf,
    /// Client releases that get their own manifest.
    pub client_versions: Vec<ClientVersion>,
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("store"),
            temp_dir: PathBuf::from("tmp"),
            uploads_dir: PathBuf::from("uploads"),
            client_versions: Vec::new(),
            poll_interval_ms: 2000,
            queue_capacity: 256,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: &Path) -> PublishResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| PublishError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from the file named by `MODHUB_CONFIG`, or use defaults when the
    /// variable is unset or points at a missing file.
    pub fn from_env() -> PublishResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if Path::new(&path).is_file() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn layout(&self) -> PathLayout {
        PathLayout::new(&self.store_root)
    }

    /// Layout of the extraction area; each job gets its own version dir.
    pub fn staging_layout(&self) -> PathLayout {
        PathLayout::new(&self.temp_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Where an upload's archive and manifest are written before enqueue.
    pub fn upload_paths(&self, name: &ModuleName, version: &ModuleVersion) -> (PathBuf, PathBuf) {
        (
            self.uploads_dir.join(format!("{name}.{version}.zip")),
            self.uploads_dir.join(format!("{name}.{version}.manifest.yml")),
        )
    }
}
