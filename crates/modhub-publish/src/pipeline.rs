//! Publish and delete job processing.
//!
//! Every store mutation goes through [`Publisher`]. A publish is extracted
//! and verified under the staging area, assembled under the store's
//! `.pending` tree, and only then renamed into `modules/`. A failed publish
//! leaves the canonical store as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use modhub_archive::{clear_directory, extract_all, ArchiveWriter};
use modhub_catalog::{version_dirs, ManifestBuilder, ModuleCatalogEntry};
use modhub_store::{
    write_document, ModuleConf, ModuleTree, PathLayout, UploadManifest, VersionMeta, DATA_DIR,
};
use modhub_types::{ModuleName, ModuleVersion};

use crate::config::WorkerConfig;
use crate::error::{PublishError, PublishResult};
use crate::queue::{DeleteJob, PublishJob};
use crate::verify::ManifestVerifier;

/// Image extensions copied out of the archive next to it.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg"];

/// What a successful publish put in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReceipt {
    pub version_dir: PathBuf,
    pub code_entries: usize,
    pub has_data: bool,
    pub images: usize,
    /// An existing directory for the same version was replaced.
    pub replaced: bool,
}

/// What a delete removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteReceipt {
    /// The whole module directory is gone.
    Module,
    /// One version directory is gone. `data_moved_to` names the next version
    /// if the data archive was copied forward to keep its chain intact.
    Version {
        data_moved_to: Option<ModuleVersion>,
    },
}

/// Applies publish and delete jobs to the store.
pub struct Publisher {
    config: WorkerConfig,
    layout: PathLayout,
    staging: PathLayout,
    verifier: Arc<dyn ManifestVerifier>,
}

impl Publisher {
    pub fn new(config: WorkerConfig, verifier: Arc<dyn ManifestVerifier>) -> Self {
        Self {
            layout: config.layout(),
            staging: config.staging_layout(),
            config,
            verifier,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    pub fn manifest_builder(&self) -> ManifestBuilder {
        ManifestBuilder::new(self.layout.clone(), self.config.client_versions.clone())
    }

    // ---------------------------------------------------------------
    // Publish
    // ---------------------------------------------------------------

    /// Extract, verify and commit one upload.
    ///
    /// Staging and pending directories are removed whatever the outcome.
    /// The upload files themselves are left for [`discard_inputs`](Self::discard_inputs).
    pub fn publish(&self, job: &PublishJob) -> PublishResult<PublishReceipt> {
        let stage_dir = self.staging.version_dir(&job.module, &job.version);
        let pending_dir = self.layout.pending().version_dir(&job.module, &job.version);

        let result = self.materialize(job, &stage_dir, &pending_dir);

        for dir in [&stage_dir, &pending_dir] {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!(path = %dir.display(), error = %e, "could not clean up work directory");
                }
            }
        }
        result
    }

    fn materialize(&self, job: &PublishJob, stage_dir: &Path, pending_dir: &Path) -> PublishResult<PublishReceipt> {
        let (name, version) = (&job.module, &job.version);

        if stage_dir.is_dir() {
            clear_directory(stage_dir)?;
        } else {
            std::fs::create_dir_all(stage_dir)?;
        }
        let extracted = extract_all(&job.archive_path, stage_dir)?;
        debug!(module = %name, version = %version, files = extracted, "upload extracted");

        let manifest = UploadManifest::load(&job.manifest_path)?;
        let problems = self.verifier.verify(stage_dir, &manifest)?;
        if !problems.is_empty() {
            return Err(PublishError::ManifestMismatch {
                module: name.to_string(),
                version: version.to_string(),
                reason: problems.join("; "),
            });
        }

        let tree = ModuleTree::new(stage_dir, name.clone());
        let conf_path = tree.conf_path();
        if !conf_path.is_file() {
            return Err(PublishError::ConfigRead {
                path: conf_path,
                reason: "module config missing from archive".into(),
            });
        }
        let conf = ModuleConf::load(&conf_path)?;
        conf.client_requirement(&conf_path)?;

        let data_manifest = if tree.has_data_dir() {
            let declared = manifest.data_only().ok_or_else(|| PublishError::ManifestMismatch {
                module: name.to_string(),
                version: version.to_string(),
                reason: "data directory is not declared in the manifest".into(),
            })?;
            Some(declared)
        } else {
            None
        };

        // Assemble the version directory under .pending.
        let pending = self.layout.pending();
        if pending_dir.exists() {
            std::fs::remove_dir_all(pending_dir)?;
        }
        std::fs::create_dir_all(pending_dir)?;

        let mut code = ArchiveWriter::new(&pending.code_archive(name, version));
        code.add_tree(stage_dir, &[tree.data_dir()])?;
        let code_file = code.finish()?;
        write_document(&pending.code_manifest(name, version), &manifest.code_only())?;

        if let Some(data_manifest) = &data_manifest {
            let mut data = ArchiveWriter::new(&pending.data_archive(name, version));
            data.add_subtree(stage_dir, Path::new(DATA_DIR))?;
            data.finish()?;
            write_document(&pending.data_manifest(name, version), data_manifest)?;
        }

        std::fs::copy(&conf_path, pending.conf(name, version))?;
        let readme = tree.readme_path();
        if readme.is_file() {
            std::fs::copy(&readme, pending.readme(name, version))?;
        }
        let images = copy_images(stage_dir, pending_dir)?;

        VersionMeta::now().write(&pending.meta(name, version))?;

        let replaced = self.commit(name, version, pending_dir)?;
        let version_dir = self.layout.version_dir(name, version);
        info!(
            module = %name,
            version = %version,
            has_data = data_manifest.is_some(),
            images,
            replaced,
            "version published"
        );
        Ok(PublishReceipt {
            version_dir,
            code_entries: code_file.entry_count,
            has_data: data_manifest.is_some(),
            images,
            replaced,
        })
    }

    /// Rename the assembled directory into `modules/`, replacing any
    /// existing directory for the same version.
    fn commit(&self, name: &ModuleName, version: &ModuleVersion, pending_dir: &Path) -> PublishResult<bool> {
        let target = self.layout.version_dir(name, version);
        let replaced = target.exists();
        if replaced {
            std::fs::remove_dir_all(&target)?;
        }
        std::fs::create_dir_all(self.layout.module_dir(name))?;
        std::fs::rename(pending_dir, &target)?;
        Ok(replaced)
    }

    /// Remove an upload's archive and manifest. Missing files are fine.
    pub fn discard_inputs(&self, job: &PublishJob) {
        for path in [&job.archive_path, &job.manifest_path] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove upload input"),
            }
        }
    }

    // ---------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------

    /// Remove a module, or one version of it.
    ///
    /// Before a version is removed, the next public version is checked: if
    /// it takes its data from the version being removed, the data archive
    /// and data manifest are copied into it first.
    pub fn delete(&self, job: &DeleteJob) -> PublishResult<DeleteReceipt> {
        let name = &job.module;
        let module_dir = self.layout.module_dir(name);
        let not_found = || PublishError::NoSuchModule {
            module: name.to_string(),
            version: job.version.as_ref().map(ToString::to_string),
        };
        if !module_dir.is_dir() {
            return Err(not_found());
        }

        let on_disk = version_dirs(&self.layout, name)?;
        let version = match &job.version {
            None => return self.remove_module(name, &module_dir),
            Some(v) if !on_disk.contains(v) => return Err(not_found()),
            Some(v) if on_disk.len() == 1 => {
                debug!(module = %name, version = %v, "deleting the only version");
                return self.remove_module(name, &module_dir);
            }
            Some(v) => v,
        };

        let data_moved_to = match ModuleCatalogEntry::load(&self.layout, name) {
            Ok(entry) => self.carry_data_forward(&entry, version)?,
            Err(e) => {
                warn!(module = %name, version = %version, error = %e, "cannot read module, deleting without data chain repair");
                None
            }
        };

        std::fs::remove_dir_all(self.layout.version_dir(name, version))?;
        info!(module = %name, version = %version, data_moved_to = ?data_moved_to, "version deleted");
        Ok(DeleteReceipt::Version { data_moved_to })
    }

    fn remove_module(&self, name: &ModuleName, module_dir: &Path) -> PublishResult<DeleteReceipt> {
        std::fs::remove_dir_all(module_dir)?;
        info!(module = %name, "module deleted");
        Ok(DeleteReceipt::Module)
    }

    /// Copy `version`'s data into the next public version if that version
    /// inherits it. Returns the version that received the copy.
    fn carry_data_forward(
        &self,
        entry: &ModuleCatalogEntry,
        version: &ModuleVersion,
    ) -> PublishResult<Option<ModuleVersion>> {
        let versions = entry.versions(None);
        let Some(index) = versions.iter().position(|v| v == version) else {
            // Private versions are outside the chain.
            return Ok(None);
        };
        let Some(next) = versions.get(index + 1) else {
            return Ok(None);
        };
        let chain = entry.data_versions(&versions);
        if chain.get(next).cloned().flatten().as_ref() != Some(version) {
            return Ok(None);
        }

        let name = entry.name();
        std::fs::copy(
            self.layout.data_archive(name, version),
            self.layout.data_archive(name, next),
        )?;
        let data_manifest = self.layout.data_manifest(name, version);
        if data_manifest.is_file() {
            std::fs::copy(&data_manifest, self.layout.data_manifest(name, next))?;
        }
        debug!(module = %name, from = %version, to = %next, "data archive carried forward");
        Ok(Some(next.clone()))
    }
}

/// Copy every image under `src` into `dest`, keeping relative paths.
fn copy_images(src: &Path, dest: &Path) -> PublishResult<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            PublishError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop while walking")
            }))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_image = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext));
        if !is_image {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}
