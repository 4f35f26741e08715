//! Checking an extracted upload against its declared manifest.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use walkdir::WalkDir;

use modhub_store::{ManifestNode, UploadManifest};

use crate::error::{PublishError, PublishResult};

/// Decides whether an extracted module tree matches its upload manifest.
pub trait ManifestVerifier: Send + Sync {
    /// Returns the list of problems found; empty means the tree matches.
    fn verify(&self, dir: &Path, manifest: &UploadManifest) -> PublishResult<Vec<String>>;
}

/// Checks every declared file by BLAKE3 digest and every declared directory
/// by presence. Files the manifest does not mention are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeDigestVerifier;

impl ManifestVerifier for TreeDigestVerifier {
    fn verify(&self, dir: &Path, manifest: &UploadManifest) -> PublishResult<Vec<String>> {
        let mut problems = Vec::new();
        check_level(dir, "", &manifest.entries, &mut problems)?;
        Ok(problems)
    }
}

fn check_level(
    dir: &Path,
    prefix: &str,
    nodes: &BTreeMap<String, ManifestNode>,
    problems: &mut Vec<String>,
) -> PublishResult<()> {
    for (name, node) in nodes {
        let rel = format!("{prefix}{name}");
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            problems.push(format!("{rel}: invalid entry name"));
            continue;
        }
        let path = dir.join(name);
        match node {
            ManifestNode::File(expected) => {
                if !path.is_file() {
                    problems.push(format!("{rel}: missing file"));
                } else if !file_digest(&path)?.eq_ignore_ascii_case(expected) {
                    problems.push(format!("{rel}: digest mismatch"));
                }
            }
            ManifestNode::Dir(children) => {
                if !path.is_dir() {
                    problems.push(format!("{rel}/: missing directory"));
                } else {
                    check_level(&path, &format!("{rel}/"), children, problems)?;
                }
            }
        }
    }
    Ok(())
}

/// Hex BLAKE3 digest of a file's contents.
pub fn file_digest(path: &Path) -> PublishResult<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Place `node` at `path`, creating parent directories as needed. Directories
/// are walked before their contents, so parents already exist as `Dir`.
fn insert_node(level: &mut BTreeMap<String, ManifestNode>, path: &[String], node: ManifestNode) {
    match path {
        [] => {}
        [leaf] => {
            level.entry(leaf.clone()).or_insert(node);
        }
        [first, rest @ ..] => {
            let parent = level
                .entry(first.clone())
                .or_insert_with(|| ManifestNode::Dir(BTreeMap::new()));
            if let ManifestNode::Dir(children) = parent {
                insert_node(children, rest, node);
            }
        }
    }
}

/// Describe a module directory as an upload manifest, in the format
/// [`TreeDigestVerifier`] checks.
pub fn describe_tree(dir: &Path) -> PublishResult<UploadManifest> {
    let mut root: BTreeMap<String, ManifestNode> = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            PublishError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop while walking")
            }))
        })?;
        let rel = entry.path().strip_prefix(dir).map_err(|_| {
            PublishError::Config(format!("{} is outside {}", entry.path().display(), dir.display()))
        })?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if entry.file_type().is_dir() {
            insert_node(&mut root, &parts, ManifestNode::Dir(BTreeMap::new()));
        } else if entry.file_type().is_file() {
            insert_node(&mut root, &parts, ManifestNode::File(file_digest(entry.path())?));
        }
    }
    Ok(UploadManifest { entries: root })
}
