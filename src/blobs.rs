//! Raw content store — original document bytes keyed by filename.
//!
//! A flat directory of uploaded files. This is the ground truth the
//! reconciliation job repairs from: a blob with no catalog row gets
//! re-registered, a catalog row with no blob gets dropped.
//!
//! Filenames are unique once registered, so there is no concurrent-write
//! hazard here; the upload path registers in the catalog before saving.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract;

#[derive(Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create blob directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(filename);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write blob: {}", path.display()))
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_of(filename);
        std::fs::read(&path).with_context(|| format!("Failed to read blob: {}", path.display()))
    }

    /// Delete the blob if present; returns whether a file was removed.
    pub fn delete(&self, filename: &str) -> Result<bool> {
        let path = self.path_of(filename);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob: {}", path.display())),
        }
    }

    /// All stored filenames with a supported extension, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if extract::is_supported(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Reduce an untrusted upload name to a bare filename.
///
/// Strips any directory components, so `../../etc/passwd` becomes `passwd`
/// and a blob can never land outside the store. Returns `None` for names
/// with no usable final component.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let bare = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())?;
    if bare.is_empty() || bare == "." || bare == ".." {
        return None;
    }
    Some(bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_read_delete_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::open(tmp.path().join("docs")).unwrap();

        store.save("a.txt", b"hello").unwrap();
        assert_eq!(store.read("a.txt").unwrap(), b"hello");
        assert!(store.delete("a.txt").unwrap());
        assert!(!store.delete("a.txt").unwrap());
        assert!(store.read("a.txt").is_err());
    }

    #[test]
    fn list_returns_supported_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::open(tmp.path().join("docs")).unwrap();

        store.save("b.txt", b"b").unwrap();
        store.save("a.pdf", b"a").unwrap();
        store.save("notes.exe", b"x").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["a.pdf".to_string(), "b.txt".to_string()]
        );
    }

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(
            sanitize_filename("../../etc/passwd.txt"),
            Some("passwd.txt".to_string())
        );
        assert_eq!(
            sanitize_filename("nested/dir/a.pdf"),
            Some("a.pdf".to_string())
        );
        assert_eq!(sanitize_filename("plain.md"), Some("plain.md".to_string()));
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("/"), None);
    }
}
