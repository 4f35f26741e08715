use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::load_document;
use crate::error::StoreResult;
use crate::layout::DATA_DIR;

/// One node of an upload manifest: a file digest or a nested directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestNode {
    /// Hex digest of the file contents.
    File(String),
    /// Directory listing keyed by entry name.
    Dir(BTreeMap<String, ManifestNode>),
}

/// The manifest a developer declares alongside an uploaded archive.
///
/// It mirrors the module tree: top-level keys are entries of the module
/// directory. The `data` key, when present, describes the data payload and
/// is split off into its own manifest when the module is stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadManifest {
    pub entries: BTreeMap<String, ManifestNode>,
}

impl UploadManifest {
    pub fn load(path: &Path) -> StoreResult<Self> {
        load_document(path)
    }

    /// Returns `true` if the manifest declares a data payload.
    pub fn has_data(&self) -> bool {
        self.entries.contains_key(DATA_DIR)
    }

    /// The manifest minus its `data` key.
    pub fn code_only(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(DATA_DIR);
        Self { entries }
    }

    /// A manifest holding only the `data` key, if there is one.
    pub fn data_only(&self) -> Option<Self> {
        let node = self.entries.get(DATA_DIR)?;
        let mut entries = BTreeMap::new();
        entries.insert(DATA_DIR.to_string(), node.clone());
        Some(Self { entries })
    }
}
