//! YAML document codec for configs, manifests and metadata files.
//!
//! Reads ignore key order. Writes go to a temporary file in the destination
//! directory which is then renamed over the target, so a concurrent reader
//! sees either the old document or the new one, never a partial write.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Parse a YAML document from `path`.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let text = std::fs::read_to_string(path)?;
    parse_document(path, &text)
}

/// Parse YAML text that came from `path` (used only for error reporting).
pub fn parse_document<T: DeserializeOwned>(path: &Path, text: &str) -> StoreResult<T> {
    serde_yaml::from_str(text).map_err(|e| StoreError::ConfigRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serialize `value` as YAML and atomically replace `path` with it.
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let text = serde_yaml::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    write_atomic(path, text.as_bytes())
}

/// Write `bytes` to a sibling temp file, fsync it, and rename it onto `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
