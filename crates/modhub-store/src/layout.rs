use std::path::{Path, PathBuf};

use modhub_types::{ClientVersion, ModuleName, ModuleVersion};

/// Name of the subtree inside an uploaded module that holds its data payload.
pub const DATA_DIR: &str = "data";

const MODULES_DIR: &str = "modules";
const PENDING_DIR: &str = ".pending";

/// Maps module names and versions to their canonical paths under a root.
///
/// ```text
/// <root>/modules/<name>/<version>/
///     <name>.yml            config
///     <name>.md             readme
///     <name>_code.zip       code archive
///     <name>_data.zip       data archive (optional)
///     code_manifest.yml
///     data_manifest.yml     (optional)
///     meta.yml              {publish_time}
///     logo.png, images...
/// <root>/manifest.yml               unscoped manifest
/// <root>/manifest.<client>.yml      per client-version bucket
/// <root>/.pending/modules/<name>/<version>/
///                                 version directory being assembled
/// ```
///
/// Pure path arithmetic, no I/O. Because [`ModuleName`] and
/// [`ModuleVersion`] reject separators and the names the layout reserves,
/// distinct inputs never map to the same path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathLayout {
    root: PathBuf,
}

impl PathLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    pub fn module_dir(&self, name: &ModuleName) -> PathBuf {
        self.modules_dir().join(name.as_str())
    }

    pub fn version_dir(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.module_dir(name).join(version.as_str())
    }

    pub fn code_archive(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join(format!("{name}_code.zip"))
    }

    pub fn data_archive(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join(format!("{name}_data.zip"))
    }

    pub fn code_manifest(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join("code_manifest.yml")
    }

    pub fn data_manifest(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join("data_manifest.yml")
    }

    pub fn meta(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join("meta.yml")
    }

    pub fn conf(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join(format!("{name}.yml"))
    }

    pub fn readme(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join(format!("{name}.md"))
    }

    pub fn logo(&self, name: &ModuleName, version: &ModuleVersion) -> PathBuf {
        self.version_dir(name, version).join("logo.png")
    }

    /// Manifest path for a client-version bucket, or the unscoped manifest
    /// when `bucket` is `None`.
    pub fn manifest(&self, bucket: Option<&ClientVersion>) -> PathBuf {
        match bucket {
            Some(client) => self.root.join(format!("manifest.{client}.yml")),
            None => self.root.join("manifest.yml"),
        }
    }

    /// Layout rooted at `<root>/.pending`. A version directory is assembled
    /// there, then renamed into this layout's modules tree.
    pub fn pending(&self) -> PathLayout {
        PathLayout::new(self.root.join(PENDING_DIR))
    }
}

/// Paths inside an unpacked module tree (an upload or a staging directory).
#[derive(Clone, Debug)]
pub struct ModuleTree {
    dir: PathBuf,
    name: ModuleName,
}

impl ModuleTree {
    pub fn new(dir: impl Into<PathBuf>, name: ModuleName) -> Self {
        Self {
            dir: dir.into(),
            name,
        }
    }

    pub fn conf_path(&self) -> PathBuf {
        self.dir.join(format!("{}.yml", self.name))
    }

    pub fn readme_path(&self) -> PathBuf {
        self.dir.join(format!("{}.md", self.name))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.join(DATA_DIR)
    }

    pub fn has_data_dir(&self) -> bool {
        self.data_dir().is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn name(s: &str) -> ModuleName {
        ModuleName::parse(s).unwrap()
    }

    fn ver(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s).unwrap()
    }

    fn all_paths(layout: &PathLayout, n: &ModuleName, v: &ModuleVersion) -> Vec<PathBuf> {
        vec![
            layout.version_dir(n, v),
            layout.code_archive(n, v),
            layout.data_archive(n, v),
            layout.code_manifest(n, v),
            layout.data_manifest(n, v),
            layout.meta(n, v),
            layout.conf(n, v),
            layout.readme(n, v),
            layout.logo(n, v),
            layout.pending().version_dir(n, v),
        ]
    }

    #[test]
    fn canonical_paths() {
        let layout = PathLayout::new("/srv/store");
        let (n, v) = (name("clinvar"), ver("1.2.0"));
        assert_eq!(layout.version_dir(&n, &v), PathBuf::from("/srv/store/modules/clinvar/1.2.0"));
        assert_eq!(
            layout.code_archive(&n, &v),
            PathBuf::from("/srv/store/modules/clinvar/1.2.0/clinvar_code.zip")
        );
        assert_eq!(
            layout.conf(&n, &v),
            PathBuf::from("/srv/store/modules/clinvar/1.2.0/clinvar.yml")
        );
        assert_eq!(layout.manifest(None), PathBuf::from("/srv/store/manifest.yml"));
        assert_eq!(
            layout.pending().version_dir(&n, &v),
            PathBuf::from("/srv/store/.pending/modules/clinvar/1.2.0")
        );
        let client = ClientVersion::parse("2.4.1").unwrap();
        assert_eq!(
            layout.manifest(Some(&client)),
            PathBuf::from("/srv/store/manifest.2.4.1.yml")
        );
    }

    #[test]
    fn paths_do_not_collide() {
        let layout = PathLayout::new("/srv/store");
        let mut seen = HashSet::new();
        for n in ["a", "b", "a_data", "a_code", "logo"] {
            for v in ["1.0", "1.0.1", "2"] {
                for p in all_paths(&layout, &name(n), &ver(v)) {
                    assert!(seen.insert(p.clone()), "duplicate path {p:?}");
                }
            }
        }
        assert!(seen.insert(layout.manifest(None)));
    }

    #[test]
    fn module_tree_paths() {
        let tree = ModuleTree::new("/tmp/stage", name("gnomad"));
        assert_eq!(tree.conf_path(), PathBuf::from("/tmp/stage/gnomad.yml"));
        assert_eq!(tree.readme_path(), PathBuf::from("/tmp/stage/gnomad.md"));
        assert_eq!(tree.data_dir(), PathBuf::from("/tmp/stage/data"));
        assert!(!tree.has_data_dir());
    }
}
