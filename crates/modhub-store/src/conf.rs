use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use modhub_types::ClientRequirement;

use crate::document::load_document;
use crate::error::{StoreError, StoreResult};

/// A module's `<name>.yml` configuration, as shipped inside its archive.
///
/// `title`, `type`, `developer` and `description` are required; everything
/// else is optional with the defaults below. Unknown keys are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleConf {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form developer block (name, organization, contact...).
    pub developer: Value,
    pub description: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub datasource: Option<Value>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub commercial_warning: Option<String>,
    #[serde(default)]
    pub requires: Option<Vec<String>>,
    /// Range of client versions this module version supports.
    #[serde(default)]
    pub requires_client_version: Option<String>,
}

impl ModuleConf {
    pub fn load(path: &Path) -> StoreResult<Self> {
        load_document(path)
    }

    /// Parse the declared client range. A missing range matches every client.
    pub fn client_requirement(&self, path: &Path) -> StoreResult<ClientRequirement> {
        match &self.requires_client_version {
            Some(expr) => ClientRequirement::parse(expr).map_err(|e| StoreError::ConfigRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            None => Ok(ClientRequirement::any()),
        }
    }
}
