use std::path::{Path, PathBuf};

use crate::error::ArchiveResult;

/// List the immediate children of `dir` as `(name, path)`, sorted by name.
pub fn list_directory(dir: &Path) -> ArchiveResult<Vec<(String, PathBuf)>> {
    let mut items = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        items.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    items.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(items)
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub fn clear_directory(dir: &Path) -> ArchiveResult<()> {
    for (_, path) in list_directory(dir)? {
        if path.is_dir() && !path.is_symlink() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_children() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();

        let names: Vec<String> = list_directory(dir.path()).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn clear_keeps_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("x/y/f"), b"f").unwrap();
        std::fs::write(dir.path().join("g"), b"g").unwrap();

        clear_directory(dir.path()).unwrap();
        assert!(dir.path().exists());
        assert!(list_directory(dir.path()).unwrap().is_empty());
    }
}
