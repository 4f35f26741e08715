use serde_yaml::Value;
use tracing::debug;

use modhub_archive::total_uncompressed_size;
use modhub_types::{ClientRequirement, ModuleName, ModuleVersion};

use crate::conf::ModuleConf;
use crate::error::StoreResult;
use crate::layout::PathLayout;
use crate::meta::VersionMeta;

/// Where a record's publish time came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishTimeSource {
    /// Read from the version's `meta.yml`.
    Meta,
    /// Derived from the code archive's modification time; not yet persisted.
    ArchiveMtime,
}

/// One published module version, as read back from the store.
///
/// Everything here is derived from files at [`PathLayout`] locations;
/// sizes come from inspecting the archives, not from stored numbers.
#[derive(Clone, Debug)]
pub struct ModuleVersionRecord {
    pub name: ModuleName,
    pub version: ModuleVersion,
    pub code_size: u64,
    /// Uncompressed size of this version's own data archive, 0 without one.
    pub data_size: u64,
    pub has_data: bool,
    pub conf: ModuleConf,
    pub client_requirement: ClientRequirement,
    pub has_logo: bool,
    pub publish_time: String,
    pub publish_time_source: PublishTimeSource,
}

impl ModuleVersionRecord {
    /// Read the record for `name`/`version` from the store.
    ///
    /// Fails if the config is missing or malformed, or if the code archive
    /// cannot be inspected.
    pub fn load(layout: &PathLayout, name: &ModuleName, version: &ModuleVersion) -> StoreResult<Self> {
        let conf_path = layout.conf(name, version);
        let conf = ModuleConf::load(&conf_path)?;
        let client_requirement = conf.client_requirement(&conf_path)?;

        let code_path = layout.code_archive(name, version);
        let code_size = total_uncompressed_size(&code_path)?;

        let data_path = layout.data_archive(name, version);
        let has_data = data_path.is_file();
        let data_size = if has_data {
            total_uncompressed_size(&data_path)?
        } else {
            0
        };

        let meta_path = layout.meta(name, version);
        let (publish_time, publish_time_source) = if meta_path.is_file() {
            (VersionMeta::load(&meta_path)?.publish_time, PublishTimeSource::Meta)
        } else {
            let modified = std::fs::metadata(&code_path)?.modified()?;
            debug!(module = %name, version = %version, "no meta.yml, using code archive mtime");
            (
                VersionMeta::from_system_time(modified).publish_time,
                PublishTimeSource::ArchiveMtime,
            )
        };

        Ok(Self {
            name: name.clone(),
            version: version.clone(),
            code_size,
            data_size,
            has_data,
            has_logo: layout.logo(name, version).is_file(),
            conf,
            client_requirement,
            publish_time,
            publish_time_source,
        })
    }

    pub fn size(&self) -> u64 {
        self.code_size + self.data_size
    }

    pub fn is_private(&self) -> bool {
        self.conf.private
    }

    pub fn datasource(&self) -> Option<&Value> {
        self.conf.datasource.as_ref()
    }

    /// Write a derived publish time to `meta.yml` so later reads use it.
    ///
    /// Returns `true` if a file was written.
    pub fn persist_publish_time(&mut self, layout: &PathLayout) -> StoreResult<bool> {
        if self.publish_time_source == PublishTimeSource::Meta {
            return Ok(false);
        }
        let meta = VersionMeta {
            publish_time: self.publish_time.clone(),
        };
        meta.write(&layout.meta(&self.name, &self.version))?;
        self.publish_time_source = PublishTimeSource::Meta;
        Ok(true)
    }
}
