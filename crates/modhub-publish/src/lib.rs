//! Publish pipeline for modhub.
//!
//! The submission layer validates a request, writes the upload to disk and
//! enqueues a job on a [`JobQueue`]. A single [`PublishWorker`] consumes both
//! queues, applies each job to the store through the [`Publisher`], and
//! batches manifest rebuilds and notifications into idle periods.
//!
//! # Architecture
//!
//! ```text
//! JobQueue ──publish──▶ ┐
//!          ──delete───▶ ┴─ PublishWorker ──▶ Publisher ──▶ store
//!                                │
//!                         (idle) ├──▶ ManifestBuilder ──▶ manifests
//!                                └──▶ Notifier
//! ```
//!
//! Job failures never stop the worker; they are logged and, for publish
//! jobs, reported through the [`Notifier`].

pub mod config;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod verify;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{WorkerConfig, CONFIG_ENV};
pub use error::{PublishError, PublishResult};
pub use notify::{LogNotifier, MemoryNotifier, Notifier};
pub use pipeline::{DeleteReceipt, PublishReceipt, Publisher};
pub use queue::{job_queue, DeleteJob, JobQueue, JobReceivers, PublishJob};
pub use verify::{describe_tree, file_digest, ManifestVerifier, TreeDigestVerifier};
pub use worker::{PublishWorker, WorkerStats};
