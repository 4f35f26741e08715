use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use modhub_types::{ModuleName, ModuleVersion};

use crate::error::PublishResult;

/// Receives the outcome of each job once the batch it belongs to has been
/// flushed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_publish_result(
        &self,
        module: &ModuleName,
        version: &ModuleVersion,
        success: bool,
    ) -> PublishResult<()>;

    /// `version` is `None` when the whole module was targeted.
    async fn notify_delete_result(
        &self,
        module: &ModuleName,
        version: Option<&ModuleVersion>,
        success: bool,
    ) -> PublishResult<()>;
}

/// Writes each outcome to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_publish_result(
        &self,
        module: &ModuleName,
        version: &ModuleVersion,
        success: bool,
    ) -> PublishResult<()> {
        info!(module = %module, version = %version, success, "publish result");
        Ok(())
    }

    async fn notify_delete_result(
        &self,
        module: &ModuleName,
        version: Option<&ModuleVersion>,
        success: bool,
    ) -> PublishResult<()> {
        info!(module = %module, version = ?version, success, "delete result");
        Ok(())
    }
}

/// Keeps every outcome in memory, in delivery order.
#[derive(Default)]
pub struct MemoryNotifier {
    results: Mutex<Vec<(ModuleName, ModuleVersion, bool)>>,
    deletes: Mutex<Vec<(ModuleName, Option<ModuleVersion>, bool)>>,
    events: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish outcomes.
    pub fn results(&self) -> Vec<(ModuleName, ModuleVersion, bool)> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Delete outcomes.
    pub fn delete_results(&self) -> Vec<(ModuleName, Option<ModuleVersion>, bool)> {
        self.deletes.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Every outcome as `publish|delete module[:version] ok|failed`, in the
    /// order delivered.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record_event(&self, kind: &str, module: &ModuleName, version: Option<&ModuleVersion>, success: bool) {
        let target = match version {
            Some(v) => format!("{module}:{v}"),
            None => module.to_string(),
        };
        let outcome = if success { "ok" } else { "failed" };
        if let Ok(mut events) = self.events.lock() {
            events.push(format!("{kind} {target} {outcome}"));
        }
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify_publish_result(
        &self,
        module: &ModuleName,
        version: &ModuleVersion,
        success: bool,
    ) -> PublishResult<()> {
        if let Ok(mut results) = self.results.lock() {
            results.push((module.clone(), version.clone(), success));
        }
        self.record_event("publish", module, Some(version), success);
        Ok(())
    }

    async fn notify_delete_result(
        &self,
        module: &ModuleName,
        version: Option<&ModuleVersion>,
        success: bool,
    ) -> PublishResult<()> {
        if let Ok(mut deletes) = self.deletes.lock() {
            deletes.push((module.clone(), version.cloned(), success));
        }
        self.record_event("delete", module, version, success);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        let name = ModuleName::parse("annot").unwrap();
        let v1 = ModuleVersion::parse("1.0").unwrap();
        let v2 = ModuleVersion::parse("2.0").unwrap();
        notifier.notify_publish_result(&name, &v1, true).await.unwrap();
        notifier.notify_publish_result(&name, &v2, false).await.unwrap();
        let results = notifier.results();
        assert_eq!(results, vec![(name.clone(), v1, true), (name, v2, false)]);
    }

    #[tokio::test]
    async fn memory_notifier_interleaves_publish_and_delete() {
        let notifier = MemoryNotifier::new();
        let name = ModuleName::parse("annot").unwrap();
        let v1 = ModuleVersion::parse("1.0").unwrap();
        notifier.notify_publish_result(&name, &v1, true).await.unwrap();
        notifier.notify_delete_result(&name, None, false).await.unwrap();
        notifier.notify_delete_result(&name, Some(&v1), true).await.unwrap();

        assert_eq!(notifier.results().len(), 1);
        assert_eq!(
            notifier.delete_results(),
            vec![(name.clone(), None, false), (name, Some(v1), true)]
        );
        assert_eq!(
            notifier.events(),
            vec!["publish annot:1.0 ok", "delete annot failed", "delete annot:1.0 ok"]
        );
    }

    #[tokio::test]
    async fn log_notifier_accepts() {
        let name = ModuleName::parse("annot").unwrap();
        let v = ModuleVersion::parse("1.0").unwrap();
        LogNotifier.notify_publish_result(&name, &v, true).await.unwrap();
        LogNotifier.notify_delete_result(&name, Some(&v), false).await.unwrap();
    }
}
