//! Store fixtures shared by the catalog tests.

use std::path::Path;

use modhub_archive::ArchiveWriter;
use modhub_store::PathLayout;
use modhub_types::{ModuleName, ModuleVersion};

#[derive(Clone, Debug, Default)]
pub struct VersionSpec {
    data: bool,
    private: bool,
    logo: bool,
    client: Option<String>,
    datasource: Option<String>,
    publish_time: Option<String>,
}

impl VersionSpec {
    pub fn data(mut self) -> Self {
        self.data = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn logo(mut self) -> Self {
        self.logo = true;
        self
    }

    pub fn client(mut self, expr: &str) -> Self {
        self.client = Some(expr.to_string());
        self
    }

    pub fn datasource(mut self, ds: &str) -> Self {
        self.datasource = Some(ds.to_string());
        self
    }

    pub fn published(mut self, time: &str) -> Self {
        self.publish_time = Some(time.to_string());
        self
    }
}

fn zip_one(dest: &Path, file: &str, bytes: &[u8]) {
    let src = tempfile::tempdir().unwrap();
    let path = src.path().join(file);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    let mut writer = ArchiveWriter::new(dest);
    writer.add_tree(src.path(), &[]).unwrap();
    writer.finish().unwrap();
}

/// Write a minimal published version: config, code archive (10 bytes) and
/// optionally a data archive (100 bytes), a logo and `meta.yml`.
pub fn seed_version(layout: &PathLayout, name: &str, version: &str, spec: VersionSpec) {
    let n = ModuleName::parse(name).unwrap();
    let v = ModuleVersion::parse(version).unwrap();
    std::fs::create_dir_all(layout.version_dir(&n, &v)).unwrap();

    let mut conf = format!(
        "title: {name} {version}\ntype: annotator\ndeveloper:\n  name: tester\ndescription: test module\nprivate: {}\n",
        spec.private
    );
    if let Some(expr) = &spec.client {
        conf.push_str(&format!("requires_client_version: '{expr}'\n"));
    }
    if let Some(ds) = &spec.datasource {
        conf.push_str(&format!("datasource: '{ds}'\n"));
    }
    std::fs::write(layout.conf(&n, &v), conf).unwrap();

    zip_one(&layout.code_archive(&n, &v), &format!("{name}.py"), &[b'c'; 10]);
    if spec.data {
        zip_one(&layout.data_archive(&n, &v), "data/db.sqlite", &[b'd'; 100]);
        std::fs::write(layout.data_manifest(&n, &v), "data:\n  db.sqlite: abc\n").unwrap();
    }
    if spec.logo {
        std::fs::write(layout.logo(&n, &v), [0x89u8, b'P', b'N', b'G']).unwrap();
    }
    if let Some(time) = &spec.publish_time {
        std::fs::write(layout.meta(&n, &v), format!("publish_time: '{time}'\n")).unwrap();
    }
}
