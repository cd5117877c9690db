//! Local state file
//!
//! The worker's state lives in a single file on disk. Its contents are
//! opaque here: restore overwrites it with the remote copy, push reads it.
//!
//! Writes are atomic (write to temp file, then rename) so a crash mid-restore
//! never leaves the worker a half-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// Reads and writes the local state file
///
/// No caching: every call goes to disk.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the state file exists on disk
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size of the state file in bytes, if it exists
    pub fn size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Read the whole state file
    ///
    /// Returns [`StorageError::NotFound`] if the file doesn't exist.
    pub fn read(&self) -> StorageResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| StorageError::from_read(e, self.path.clone()))
    }

    /// Replace the state file with `data`
    pub fn write(&self, data: &[u8]) -> StorageResult<()> {
        atomic_write(&self.path, data)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    // Same directory so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".keepsake-tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStateStore::new(temp_dir.path().join("maindb.json"));

        assert!(!store.exists());
        assert!(store.size().is_none());
        assert!(store.read().unwrap_err().is_not_found());
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStateStore::new(temp_dir.path().join("maindb.json"));

        store.write(br#"{"devices":[]}"#).unwrap();
        assert!(store.exists());
        assert_eq!(store.size(), Some(14));
        assert_eq!(store.read().unwrap(), br#"{"devices":[]}"#);
    }

    #[test]
    fn test_write_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStateStore::new(temp_dir.path().join("maindb.json"));

        store.write(b"first version, longer").unwrap();
        store.write(b"second").unwrap();
        assert_eq!(store.read().unwrap(), b"second");
    }

    #[test]
    fn test_binary_content_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStateStore::new(temp_dir.path().join("state.bin"));

        let data: Vec<u8> = (0..=255).collect();
        store.write(&data).unwrap();
        assert_eq!(store.read().unwrap(), data);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("maindb.json");

        atomic_write(&nested_path, b"test data").unwrap();

        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "test data");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("maindb.json");
        let store = LocalStateStore::new(&path);

        store.write(b"{}").unwrap();

        assert!(!temp_path_for(&path).exists());
        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
