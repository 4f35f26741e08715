//! Full manifest rebuild.
//!
//! A build walks every module in the store, then emits one manifest per
//! known client-version bucket plus the unscoped one. Each document is
//! written whole and swapped into place atomically; nothing is patched.

use tracing::{debug, info, warn};

use modhub_store::{write_document, PathLayout};
use modhub_types::{ClientVersion, ModuleName};

use crate::entry::ModuleCatalogEntry;
use crate::error::CatalogResult;
use crate::manifest::{Manifest, ManifestEntry};
use crate::scan::module_names;

/// Outcome of one bucket of a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketReport {
    /// `None` for the unscoped manifest.
    pub client: Option<ClientVersion>,
    pub modules: usize,
}

/// Outcome of a full build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub buckets: Vec<BucketReport>,
    /// Modules left out of every bucket because they could not be read.
    pub skipped: Vec<ModuleName>,
    /// `meta.yml` files written for versions that lacked one.
    pub meta_written: usize,
}

/// Rebuilds every manifest from the store.
#[derive(Clone, Debug)]
pub struct ManifestBuilder {
    layout: PathLayout,
    client_versions: Vec<ClientVersion>,
}

impl ManifestBuilder {
    pub fn new(layout: PathLayout, client_versions: Vec<ClientVersion>) -> Self {
        Self {
            layout,
            client_versions,
        }
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    /// Walk the store and rewrite every manifest.
    ///
    /// A module that cannot be read is skipped with a warning. Only failing
    /// to list the store or to write a manifest aborts the build.
    pub fn build(&self) -> CatalogResult<BuildReport> {
        let mut report = BuildReport::default();
        let entries = self.load_entries(&mut report)?;

        let buckets = self
            .client_versions
            .iter()
            .map(Some)
            .chain(std::iter::once(None));
        for client in buckets {
            let manifest = manifest_for(&entries, client);
            write_document(&self.layout.manifest(client), &manifest)?;
            debug!(
                bucket = client.map_or("unscoped", |c| c.as_str()),
                modules = manifest.len(),
                "manifest written"
            );
            report.buckets.push(BucketReport {
                client: client.cloned(),
                modules: manifest.len(),
            });
        }

        info!(
            modules = entries.len(),
            buckets = report.buckets.len(),
            skipped = report.skipped.len(),
            "manifest rebuild complete"
        );
        Ok(report)
    }

    fn load_entries(&self, report: &mut BuildReport) -> CatalogResult<Vec<ModuleCatalogEntry>> {
        let mut entries = Vec::new();
        for name in module_names(&self.layout)? {
            let mut entry = match ModuleCatalogEntry::load(&self.layout, &name) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(module = %name, error = %e, "skipping unreadable module");
                    report.skipped.push(name);
                    continue;
                }
            };
            match entry.persist_publish_times(&self.layout) {
                Ok(n) => report.meta_written += n,
                Err(e) => warn!(module = %name, error = %e, "could not persist publish time"),
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Build the manifest for one bucket from already-loaded entries.
pub fn manifest_for(entries: &[ModuleCatalogEntry], client: Option<&ClientVersion>) -> Manifest {
    let mut manifest = Manifest::default();
    for entry in entries {
        if let Some(line) = entry_for(entry, client) {
            manifest.modules.insert(entry.name().clone(), line);
        }
    }
    manifest
}

/// The manifest line for `entry`, or `None` if no version matches `client`.
fn entry_for(entry: &ModuleCatalogEntry, client: Option<&ClientVersion>) -> Option<ManifestEntry> {
    let records = entry.matching_records(client);
    let latest = *records.last()?;
    let versions: Vec<_> = records.iter().map(|r| r.version.clone()).collect();
    let data_versions = entry.data_versions(&versions);

    let data_size = data_versions
        .get(&latest.version)
        .cloned()
        .flatten()
        .and_then(|v| entry.record(&v))
        .map_or(0, |r| r.data_size);

    // Earliest version whose datasource equals the current one.
    let current_ds = latest.datasource();
    let since = records
        .iter()
        .find(|r| r.datasource() == current_ds)
        .copied()
        .unwrap_or(latest);

    let data_sources = records
        .iter()
        .map(|r| (r.version.clone(), r.datasource().cloned()))
        .collect();

    let conf = &latest.conf;
    Some(ManifestEntry {
        title: conf.title.clone(),
        kind: conf.kind.clone(),
        developer: conf.developer.clone(),
        description: conf.description.clone(),
        tags: conf.tags.clone(),
        datasource: conf.datasource.clone(),
        hidden: conf.hidden,
        versions,
        data_versions,
        latest_version: latest.version.clone(),
        code_size: latest.code_size,
        data_size,
        size: latest.code_size + data_size,
        publish_time: since.publish_time.clone(),
        has_logo: latest.has_logo,
        requires: conf.requires.clone(),
        groups: conf.groups.clone(),
        data_sources,
        commercial_warning: conf.commercial_warning.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestReader;
    use crate::testutil::{seed_version, VersionSpec};
    use modhub_types::ModuleVersion;

    fn name(s: &str) -> ModuleName {
        ModuleName::parse(s).unwrap()
    }

    fn ver(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s).unwrap()
    }

    fn read(layout: &PathLayout, client: Option<&ClientVersion>) -> Manifest {
        ManifestReader::at(layout.manifest(client)).read().unwrap()
    }

    #[test]
    fn latest_is_highest_public_version() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "annot", "1.2", VersionSpec::default());
        seed_version(&layout, "annot", "1.10", VersionSpec::default().logo());
        seed_version(&layout, "annot", "2.0", VersionSpec::default().private());

        ManifestBuilder::new(layout.clone(), vec![]).build().unwrap();
        let manifest = read(&layout, None);
        let entry = manifest.get(&name("annot")).unwrap();
        assert_eq!(entry.latest_version, ver("1.10"));
        assert_eq!(entry.versions, vec![ver("1.2"), ver("1.10")]);
        assert!(entry.has_logo);
        assert_eq!(entry.title, "annot 1.10");
    }

    #[test]
    fn fully_private_module_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "secret", "1.0", VersionSpec::default().private());
        seed_version(&layout, "secret", "2.0", VersionSpec::default().private());
        seed_version(&layout, "open", "1.0", VersionSpec::default());
        let client = ClientVersion::parse("2.0").unwrap();

        ManifestBuilder::new(layout.clone(), vec![client.clone()]).build().unwrap();
        for bucket in [None, Some(&client)] {
            let manifest = read(&layout, bucket);
            assert!(manifest.get(&name("secret")).is_none());
            assert!(manifest.get(&name("open")).is_some());
        }
    }

    #[test]
    fn sizes_follow_data_chain() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "annot", "1", VersionSpec::default().data());
        seed_version(&layout, "annot", "2", VersionSpec::default());
        seed_version(&layout, "plain", "1", VersionSpec::default());

        ManifestBuilder::new(layout.clone(), vec![]).build().unwrap();
        let manifest = read(&layout, None);

        let annot = manifest.get(&name("annot")).unwrap();
        assert_eq!(annot.data_versions[&ver("2")], Some(ver("1")));
        assert_eq!(annot.code_size, 10);
        assert_eq!(annot.data_size, 100);
        assert_eq!(annot.size, 110);

        let plain = manifest.get(&name("plain")).unwrap();
        assert_eq!(plain.data_size, 0);
        assert_eq!(plain.size, 10);
        assert_eq!(plain.data_versions[&ver("1")], None);
    }

    #[test]
    fn publish_time_is_earliest_with_current_datasource() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let t = |d: u32| format!("2024-01-0{d}T00:00:00.000000+0000");
        seed_version(&layout, "annot", "1", VersionSpec::default().datasource("a").published(&t(1)));
        seed_version(&layout, "annot", "2", VersionSpec::default().datasource("b").published(&t(2)));
        seed_version(&layout, "annot", "3", VersionSpec::default().datasource("a").published(&t(3)));
        seed_version(&layout, "annot", "4", VersionSpec::default().datasource("a").published(&t(4)));

        ManifestBuilder::new(layout.clone(), vec![]).build().unwrap();
        let entry = read(&layout, None).modules.remove(&name("annot")).unwrap();
        // First match from the start, not the most recent change.
        assert_eq!(entry.publish_time, t(1));
        assert_eq!(entry.data_sources.len(), 4);
    }

    #[test]
    fn client_buckets_filter_versions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "annot", "1.0", VersionSpec::default().client("<2"));
        seed_version(&layout, "annot", "2.0", VersionSpec::default().client(">=2"));
        seed_version(&layout, "newonly", "1.0", VersionSpec::default().client(">=2"));
        let old = ClientVersion::parse("1.5").unwrap();
        let new = ClientVersion::parse("2.1").unwrap();

        let report = ManifestBuilder::new(layout.clone(), vec![old.clone(), new.clone()])
            .build()
            .unwrap();
        assert_eq!(report.buckets.len(), 3);
        assert_eq!(report.buckets[0], BucketReport { client: Some(old.clone()), modules: 1 });
        assert_eq!(report.buckets[2], BucketReport { client: None, modules: 2 });

        let old_manifest = read(&layout, Some(&old));
        assert_eq!(old_manifest.get(&name("annot")).unwrap().latest_version, ver("1.0"));
        assert!(old_manifest.get(&name("newonly")).is_none());

        let new_manifest = read(&layout, Some(&new));
        assert_eq!(new_manifest.get(&name("annot")).unwrap().versions, vec![ver("2.0")]);
    }

    #[test]
    fn pep440_ranges_are_listed_and_bucketed() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "annot", "1.0", VersionSpec::default().client("~=2.1"));
        seed_version(&layout, "other", "1.0", VersionSpec::default().client(">=2.0,!=2.0.3"));
        seed_version(&layout, "pinned", "1.0", VersionSpec::default().client("==2.1"));
        let patched = ClientVersion::parse("2.1.5").unwrap();
        let excluded = ClientVersion::parse("2.0.3").unwrap();

        let report = ManifestBuilder::new(layout.clone(), vec![patched.clone(), excluded.clone()])
            .build()
            .unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(read(&layout, None).len(), 3);

        let for_patched = read(&layout, Some(&patched));
        assert!(for_patched.get(&name("annot")).is_some());
        assert!(for_patched.get(&name("other")).is_some());
        assert!(for_patched.get(&name("pinned")).is_none());

        let for_excluded = read(&layout, Some(&excluded));
        assert_eq!(for_excluded.len(), 0);
    }

    #[test]
    fn broken_module_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "good", "1.0", VersionSpec::default());
        seed_version(&layout, "bad", "1.0", VersionSpec::default());
        let (n, v) = (name("bad"), ver("1.0"));
        std::fs::write(layout.conf(&n, &v), "title: missing the rest\n").unwrap();

        let report = ManifestBuilder::new(layout.clone(), vec![]).build().unwrap();
        assert_eq!(report.skipped, vec![name("bad")]);
        let manifest = read(&layout, None);
        assert_eq!(manifest.len(), 1);
        assert!(manifest.get(&name("good")).is_some());
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        seed_version(&layout, "annot", "1", VersionSpec::default().data().datasource("x"));
        seed_version(&layout, "annot", "2", VersionSpec::default());
        seed_version(&layout, "other", "0.1", VersionSpec::default());
        let builder = ManifestBuilder::new(layout.clone(), vec![]);

        let first = builder.build().unwrap();
        assert_eq!(first.meta_written, 3);
        let bytes = std::fs::read(layout.manifest(None)).unwrap();

        let second = builder.build().unwrap();
        assert_eq!(second.meta_written, 0);
        assert_eq!(std::fs::read(layout.manifest(None)).unwrap(), bytes);
    }

    #[test]
    fn empty_store_writes_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        ManifestBuilder::new(layout.clone(), vec![]).build().unwrap();
        assert!(layout.manifest(None).is_file());
        assert!(read(&layout, None).is_empty());
    }
}
