use std::fs::File;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, ArchiveResult};

/// Result of writing an archive.
#[derive(Clone, Debug)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub entry_count: usize,
    pub uncompressed_size: u64,
}

#[derive(Clone, Debug)]
enum EntryKind {
    File,
    Dir,
}

/// A single queued entry: the name inside the archive and where it comes from.
#[derive(Clone, Debug)]
struct ArchiveEntry {
    name: String,
    source: PathBuf,
    kind: EntryKind,
    size: u64,
}

/// Builds a zip archive from files on disk.
///
/// Entry names are relative to a root directory and always use `/`
/// separators. The archive is written to a temporary file next to the
/// destination and renamed into place by [`ArchiveWriter::finish`], so a
/// reader never observes a half-written archive.
pub struct ArchiveWriter {
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveWriter {
    /// Create a writer targeting `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Queue every file and directory under `root`, skipping each path in
    /// `exclude` together with everything below it.
    pub fn add_tree(&mut self, root: &Path, exclude: &[PathBuf]) -> ArchiveResult<()> {
        self.add_walk(root, root, exclude)
    }

    /// Queue `root/subtree` and everything below it, with names still
    /// relative to `root` (so a `data` subtree lands under `data/`).
    pub fn add_subtree(&mut self, root: &Path, subtree: &Path) -> ArchiveResult<()> {
        let start = root.join(subtree);
        if !start.starts_with(root) {
            return Err(ArchiveError::OutsideRoot {
                path: start,
                root: root.to_path_buf(),
            });
        }
        let name = entry_name(root, &start)?;
        self.entries.push(ArchiveEntry {
            name,
            source: start.clone(),
            kind: EntryKind::Dir,
            size: 0,
        });
        self.add_walk(root, &start, &[])
    }

    /// Number of entries queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the archive to disk.
    pub fn finish(self) -> ArchiveResult<ArchiveFile> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut uncompressed_size = 0u64;
        {
            let mut zip = ZipWriter::new(tmp.as_file_mut());
            for entry in &self.entries {
                match entry.kind {
                    EntryKind::Dir => {
                        zip.add_directory(entry.name.clone(), options)?;
                    }
                    EntryKind::File => {
                        zip.start_file(entry.name.clone(), options)?;
                        let mut src = File::open(&entry.source)?;
                        std::io::copy(&mut src, &mut zip)?;
                        uncompressed_size += entry.size;
                    }
                }
            }
            zip.finish()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| ArchiveError::Io(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            uncompressed_size,
            "archive written"
        );

        Ok(ArchiveFile {
            path: self.path,
            entry_count: self.entries.len(),
            uncompressed_size,
        })
    }

    fn add_walk(&mut self, root: &Path, start: &Path, exclude: &[PathBuf]) -> ArchiveResult<()> {
        let walker = WalkDir::new(start)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !exclude.iter().any(|x| e.path() == x.as_path()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                ArchiveError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop while walking")
                }))
            })?;
            let name = entry_name(root, entry.path())?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.entries.push(ArchiveEntry {
                    name,
                    source: entry.path().to_path_buf(),
                    kind: EntryKind::Dir,
                    size: 0,
                });
            } else if file_type.is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                self.entries.push(ArchiveEntry {
                    name,
                    source: entry.path().to_path_buf(),
                    kind: EntryKind::File,
                    size,
                });
            } else {
                tracing::debug!(path = %entry.path().display(), "skipping non-regular file");
            }
        }
        Ok(())
    }
}

/// Archive entry name for `path`, relative to `root`, with `/` separators.
fn entry_name(root: &Path, path: &Path) -> ArchiveResult<String> {
    let rel = path.strip_prefix(root).map_err(|_| ArchiveError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
