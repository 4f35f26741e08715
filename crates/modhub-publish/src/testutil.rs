//! Upload fixtures shared by the pipeline and worker tests.

use modhub_archive::ArchiveWriter;
use modhub_store::{write_document, ManifestNode};
use modhub_types::{ModuleName, ModuleVersion};

use crate::config::WorkerConfig;
use crate::queue::PublishJob;
use crate::verify::describe_tree;

pub fn conf_text(private: bool) -> String {
    format!(
        "title: Test module\ntype: annotator\ndeveloper:\n  name: tester\ndescription: a module under test\nprivate: {private}\n"
    )
}

/// A module upload to be built on disk.
#[derive(Clone, Debug)]
pub struct Upload {
    name: String,
    version: String,
    conf: Option<String>,
    readme: bool,
    data: bool,
    images: Vec<String>,
    missing: Vec<String>,
}

impl Upload {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            conf: None,
            readme: false,
            data: false,
            images: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn conf(mut self, text: &str) -> Self {
        self.conf = Some(text.to_string());
        self
    }

    pub fn readme(mut self) -> Self {
        self.readme = true;
        self
    }

    pub fn data(mut self) -> Self {
        self.data = true;
        self
    }

    pub fn image(mut self, rel: &str) -> Self {
        self.images.push(rel.to_string());
        self
    }

    /// Declare a file in the manifest that the archive will not contain.
    pub fn declare_missing(mut self, rel: &str) -> Self {
        self.missing.push(rel.to_string());
        self
    }
}

/// Write the upload's archive and manifest into `uploads_dir` and return
/// the job that points at them.
pub fn build_upload(config: &WorkerConfig, upload: Upload) -> PublishJob {
    let module = ModuleName::parse(&upload.name).unwrap();
    let version = ModuleVersion::parse(&upload.version).unwrap();

    let src = tempfile::tempdir().unwrap();
    let root = src.path();
    std::fs::write(root.join(format!("{}.py", upload.name)), format!("# {}\n", upload.version)).unwrap();
    let conf = upload.conf.clone().unwrap_or_else(|| conf_text(false));
    std::fs::write(root.join(format!("{}.yml", upload.name)), conf).unwrap();
    if upload.readme {
        std::fs::write(root.join(format!("{}.md", upload.name)), "# Readme\n").unwrap();
    }
    if upload.data {
        std::fs::create_dir_all(root.join("data")).unwrap();
        std::fs::write(root.join("data/db.sqlite"), vec![7u8; 256]).unwrap();
    }
    for rel in &upload.images {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, [0x89u8, b'P', b'N', b'G']).unwrap();
    }

    let mut manifest = describe_tree(root).unwrap();
    for rel in &upload.missing {
        manifest
            .entries
            .insert(rel.clone(), ManifestNode::File("0".repeat(64)));
    }

    let (archive_path, manifest_path) = config.upload_paths(&module, &version);
    std::fs::create_dir_all(&config.uploads_dir).unwrap();
    let mut writer = ArchiveWriter::new(&archive_path);
    writer.add_tree(root, &[]).unwrap();
    writer.finish().unwrap();
    write_document(&manifest_path, &manifest).unwrap();

    PublishJob {
        module,
        version,
        archive_path,
        manifest_path,
    }
}
