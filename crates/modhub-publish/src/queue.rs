//! Job submission.
//!
//! The submission side holds a cloneable [`JobQueue`]; the worker owns the
//! matching [`JobReceivers`]. Both queues are bounded FIFOs. When every
//! `JobQueue` clone is dropped the worker drains what is left and stops.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use modhub_catalog::ManifestReader;
use modhub_store::PathLayout;
use modhub_types::{ModuleName, ModuleVersion};

use crate::error::{PublishError, PublishResult};

/// An upload waiting to be processed. Both files must be complete before
/// the job is enqueued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishJob {
    pub module: ModuleName,
    pub version: ModuleVersion,
    pub archive_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// A removal request. `version: None` removes every version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteJob {
    pub module: ModuleName,
    pub version: Option<ModuleVersion>,
}

/// Producer handle for the publish and delete queues.
#[derive(Clone, Debug)]
pub struct JobQueue {
    publish: mpsc::Sender<PublishJob>,
    delete: mpsc::Sender<DeleteJob>,
    manifest: ManifestReader,
}

/// Consumer ends of both queues, owned by the worker.
#[derive(Debug)]
pub struct JobReceivers {
    pub(crate) publish: mpsc::Receiver<PublishJob>,
    pub(crate) delete: mpsc::Receiver<DeleteJob>,
}

/// Create both queues. Pre-checks read the unscoped manifest under `layout`.
pub fn job_queue(layout: &PathLayout, capacity: usize) -> (JobQueue, JobReceivers) {
    let (publish_tx, publish_rx) = mpsc::channel(capacity.max(1));
    let (delete_tx, delete_rx) = mpsc::channel(capacity.max(1));
    let queue = JobQueue {
        publish: publish_tx,
        delete: delete_tx,
        manifest: ManifestReader::new(layout),
    };
    let receivers = JobReceivers {
        publish: publish_rx,
        delete: delete_rx,
    };
    (queue, receivers)
}

impl JobQueue {
    pub async fn enqueue_publish(&self, job: PublishJob) -> PublishResult<()> {
        debug!(module = %job.module, version = %job.version, "enqueue publish");
        self.publish.send(job).await.map_err(|_| PublishError::QueueClosed)
    }

    pub async fn enqueue_delete(&self, job: DeleteJob) -> PublishResult<()> {
        debug!(module = %job.module, version = ?job.version, "enqueue delete");
        self.delete.send(job).await.map_err(|_| PublishError::QueueClosed)
    }

    /// Reject a publish of a version that is already listed, unless
    /// `overwrite` is set.
    ///
    /// Reads the manifest with blocking retries.
    pub fn check_publish(&self, module: &ModuleName, version: &ModuleVersion, overwrite: bool) -> PublishResult<()> {
        if !overwrite && self.manifest.module_exists(module, Some(version))? {
            return Err(PublishError::VersionExists {
                module: module.to_string(),
                version: version.to_string(),
            });
        }
        Ok(())
    }

    /// Reject a delete of a module, or a version of it, that is not listed.
    ///
    /// Reads the manifest with blocking retries.
    pub fn check_delete(&self, module: &ModuleName, version: Option<&ModuleVersion>) -> PublishResult<()> {
        if !self.manifest.module_exists(module, version)? {
            return Err(PublishError::NoSuchModule {
                module: module.to_string(),
                version: version.map(ToString::to_string),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ModuleName {
        ModuleName::parse(s).unwrap()
    }

    fn ver(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s).unwrap()
    }

    const MANIFEST: &str = r#"
annot:
  title: Annot
  type: annotator
  developer: me
  description: d
  tags: null
  datasource: null
  hidden: false
  versions: ['1.0', '1.1']
  data_versions: {'1.0': null, '1.1': null}
  latest_version: '1.1'
  code_size: 1
  data_size: 0
  size: 1
  publish_time: '2024-01-01T00:00:00.000000+0000'
  has_logo: false
  requires: null
  groups: []
  data_sources: {'1.0': null, '1.1': null}
  commercial_warning: null
"#;

    #[test]
    fn prechecks_read_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        std::fs::write(layout.manifest(None), MANIFEST).unwrap();
        let (queue, _rx) = job_queue(&layout, 4);

        assert!(matches!(
            queue.check_publish(&name("annot"), &ver("1.1"), false),
            Err(PublishError::VersionExists { .. })
        ));
        queue.check_publish(&name("annot"), &ver("1.1"), true).unwrap();
        queue.check_publish(&name("annot"), &ver("1.2"), false).unwrap();

        queue.check_delete(&name("annot"), None).unwrap();
        queue.check_delete(&name("annot"), Some(&ver("1.0"))).unwrap();
        assert!(matches!(
            queue.check_delete(&name("annot"), Some(&ver("9.9"))),
            Err(PublishError::NoSuchModule { .. })
        ));
        assert!(matches!(
            queue.check_delete(&name("other"), None),
            Err(PublishError::NoSuchModule { .. })
        ));
    }

    #[tokio::test]
    async fn queues_are_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, mut rx) = job_queue(&PathLayout::new(dir.path()), 8);
        for v in ["1", "2", "3"] {
            queue
                .enqueue_delete(DeleteJob { module: name("annot"), version: Some(ver(v)) })
                .await
                .unwrap();
        }
        for v in ["1", "2", "3"] {
            let job = rx.delete.recv().await.unwrap();
            assert_eq!(job.version, Some(ver(v)));
        }
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, rx) = job_queue(&PathLayout::new(dir.path()), 1);
        drop(rx);
        let err = queue
            .enqueue_delete(DeleteJob { module: name("annot"), version: None })
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::QueueClosed));
    }
}
