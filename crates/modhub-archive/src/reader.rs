use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{ArchiveError, ArchiveResult};

/// Read access to a zip archive on disk.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ArchiveReader {
    /// Open an archive. Unreadable archive bytes report `CorruptArchive`.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file).map_err(|e| corrupt(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Sum of the uncompressed sizes of every entry.
    pub fn uncompressed_size(&mut self) -> ArchiveResult<u64> {
        let mut total = 0u64;
        for i in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(i).map_err(|e| corrupt(&self.path, e))?;
            total += entry.size();
        }
        Ok(total)
    }

    /// Extract every entry below `dest`, creating directories as needed.
    ///
    /// Entry names that would resolve outside `dest` are rejected. Returns
    /// the number of files written.
    pub fn extract_all(&mut self, dest: &Path) -> ArchiveResult<usize> {
        std::fs::create_dir_all(dest)?;
        let mut files = 0;

        for i in 0..self.archive.len() {
            let mut entry = self.archive.by_index(i).map_err(|e| corrupt(&self.path, e))?;
            let rel = match entry.enclosed_name() {
                Some(p) => p,
                None => {
                    return Err(ArchiveError::UnsafeEntry {
                        path: self.path.clone(),
                        name: entry.name().to_string(),
                    })
                }
            };
            let dest_path = dest.join(rel);

            if entry.is_dir() {
                std::fs::create_dir_all(&dest_path)?;
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut out = TrackedWriter::new(File::create(&dest_path)?);
            if let Err(e) = io::copy(&mut entry, &mut out) {
                return Err(match out.write_error.take() {
                    Some(write_err) => ArchiveError::Io(write_err),
                    None => corrupt(&self.path, e),
                });
            }
            files += 1;
        }

        tracing::debug!(archive = %self.path.display(), dest = %dest.display(), files, "archive extracted");
        Ok(files)
    }
}

/// Extract `archive` into `dest`.
pub fn extract_all(archive: &Path, dest: &Path) -> ArchiveResult<usize> {
    ArchiveReader::open(archive)?.extract_all(dest)
}

/// Total uncompressed size of every entry in `archive`.
pub fn total_uncompressed_size(archive: &Path) -> ArchiveResult<u64> {
    ArchiveReader::open(archive)?.uncompressed_size()
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::CorruptArchive {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Remembers whether a failure came from the destination side of a copy,
/// so read failures can be reported as archive corruption.
struct TrackedWriter<W> {
    inner: W,
    write_error: Option<io::Error>,
}

impl<W> TrackedWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            write_error: None,
        }
    }
}

impl<W: Write> Write for TrackedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| {
            let kind = e.kind();
            self.write_error = Some(e);
            io::Error::new(kind, "destination write failed")
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| {
            let kind = e.kind();
            self.write_error = Some(e);
            io::Error::new(kind, "destination flush failed")
        })
    }
}
