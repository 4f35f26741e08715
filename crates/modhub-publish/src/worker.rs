//! The single consumer of both job queues.
//!
//! Jobs run one at a time on the blocking pool, publish jobs ahead of
//! deletes. When neither queue yields a job within the poll interval the
//! worker flushes: it rebuilds the manifests once if the store changed
//! since the last flush, then delivers the pending job notifications in the
//! order the jobs ran.

use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tracing::{error, info, warn};

use modhub_types::{ModuleName, ModuleVersion};

use crate::error::{PublishError, PublishResult};
use crate::notify::Notifier;
use crate::pipeline::Publisher;
use crate::queue::{DeleteJob, JobReceivers, PublishJob};

/// Counters returned when the worker stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub published: u64,
    /// Publish and delete jobs that failed.
    pub failed: u64,
    pub deleted: u64,
    pub rebuilds: u64,
}

/// A job result waiting for the next flush.
#[derive(Clone, Debug)]
enum Outcome {
    Publish(ModuleName, ModuleVersion, bool),
    Delete(ModuleName, Option<ModuleVersion>, bool),
}

pub struct PublishWorker {
    publisher: Arc<Publisher>,
    notifier: Arc<dyn Notifier>,
    receivers: JobReceivers,
    poll_interval: Duration,
    /// Job outcomes not yet delivered.
    outcomes: Vec<Outcome>,
    /// The store changed since the last rebuild.
    dirty: bool,
    stats: WorkerStats,
}

impl PublishWorker {
    pub fn new(publisher: Arc<Publisher>, notifier: Arc<dyn Notifier>, receivers: JobReceivers) -> Self {
        let poll_interval = publisher.config().poll_interval();
        Self {
            publisher,
            notifier,
            receivers,
            poll_interval,
            outcomes: Vec::new(),
            dirty: false,
            stats: WorkerStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Process jobs until every [`JobQueue`](crate::JobQueue) handle is
    /// dropped and both queues are drained, then flush one last time.
    pub async fn run(mut self) -> WorkerStats {
        info!(poll_ms = self.poll_interval.as_millis() as u64, "publish worker started");
        let mut publish_open = true;
        let mut delete_open = true;

        while publish_open || delete_open {
            tokio::select! {
                biased;

                job = self.receivers.publish.recv(), if publish_open => match job {
                    Some(job) => self.handle_publish(job).await,
                    None => publish_open = false,
                },
                job = self.receivers.delete.recv(), if delete_open => match job {
                    Some(job) => self.handle_delete(job).await,
                    None => delete_open = false,
                },
                _ = tokio::time::sleep(self.poll_interval) => self.flush().await,
            }
        }

        self.flush().await;
        info!(
            published = self.stats.published,
            failed = self.stats.failed,
            deleted = self.stats.deleted,
            rebuilds = self.stats.rebuilds,
            "publish worker stopped"
        );
        self.stats
    }

    async fn handle_publish(&mut self, job: PublishJob) {
        info!(module = %job.module, version = %job.version, archive = %job.archive_path.display(), "publish job received");
        let (module, version) = (job.module.clone(), job.version.clone());
        let publisher = Arc::clone(&self.publisher);
        let result = blocking(move || {
            let result = publisher.publish(&job);
            publisher.discard_inputs(&job);
            result
        })
        .await;

        match result {
            Ok(receipt) => {
                info!(module = %module, version = %version, replaced = receipt.replaced, "publish job complete");
                self.stats.published += 1;
                self.dirty = true;
                self.outcomes.push(Outcome::Publish(module, version, true));
            }
            Err(e) => {
                error!(module = %module, version = %version, error = %e, "publish job failed");
                self.stats.failed += 1;
                self.outcomes.push(Outcome::Publish(module, version, false));
            }
        }
    }

    async fn handle_delete(&mut self, job: DeleteJob) {
        info!(module = %job.module, version = ?job.version, "delete job received");
        let publisher = Arc::clone(&self.publisher);
        let target = job.clone();
        let result = blocking(move || publisher.delete(&target)).await;

        match result {
            Ok(receipt) => {
                info!(module = %job.module, version = ?job.version, receipt = ?receipt, "delete job complete");
                self.stats.deleted += 1;
                self.dirty = true;
                self.outcomes.push(Outcome::Delete(job.module, job.version, true));
            }
            Err(e) => {
                error!(module = %job.module, version = ?job.version, error = %e, "delete job failed");
                self.stats.failed += 1;
                // Past the existence check a failed delete may still have
                // copied data forward.
                if !matches!(e, PublishError::NoSuchModule { .. }) {
                    self.dirty = true;
                }
                self.outcomes.push(Outcome::Delete(job.module, job.version, false));
            }
        }
    }

    /// Rebuild if the store changed, then deliver pending notifications.
    async fn flush(&mut self) {
        if self.dirty {
            info!("rebuilding manifests");
            let builder = self.publisher.manifest_builder();
            let result = blocking(move || builder.build().map_err(PublishError::from)).await;
            match result {
                Ok(report) => {
                    for bucket in &report.buckets {
                        info!(
                            bucket = bucket.client.as_ref().map_or("unscoped", |c| c.as_str()),
                            modules = bucket.modules,
                            "manifest bucket written"
                        );
                    }
                    self.stats.rebuilds += 1;
                    self.dirty = false;
                }
                // Stay dirty so the next idle flush tries again.
                Err(e) => error!(error = %e, "manifest rebuild failed"),
            }
        }

        for outcome in std::mem::take(&mut self.outcomes) {
            let sent = match &outcome {
                Outcome::Publish(module, version, success) => {
                    info!(module = %module, version = %version, success, "sending publish notification");
                    self.notifier.notify_publish_result(module, version, *success).await
                }
                Outcome::Delete(module, version, success) => {
                    info!(module = %module, version = ?version, success, "sending delete notification");
                    self.notifier
                        .notify_delete_result(module, version.as_ref(), *success)
                        .await
                }
            };
            if let Err(e) = sent {
                warn!(outcome = ?outcome, error = %e, "notification failed");
            }
        }
    }
}

/// Run `f` on the blocking pool. A panic inside it becomes
/// [`PublishError::Task`].
async fn blocking<T, F>(f: F) -> PublishResult<T>
where
    F: FnOnce() -> PublishResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| PublishError::Task(e.to_string()))?
}
