//! File-backed durable storage.
//!
//! Each key is stored as `<dir>/<key>.json`. The directory is created on the
//! first write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::platform::KeyValueStorage;

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage under the platform data directory.
    pub fn in_platform_dir() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "kickoff", "kickoff").ok_or_else(|| {
            StorageError::Unavailable("could not determine data directory".to_string())
        })?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(path = ?path, "storage_read");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| match e.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
                StorageError::QuotaExceeded
            }
            _ => StorageError::Io(e),
        })?;
        info!(path = ?path, bytes = value.len(), "storage_written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path());
        assert!(storage.get("app-state").unwrap().is_none());
    }

    #[test]
    fn test_write_creates_directory() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().join("nested").join("data"));

        storage.set("app-state", "{\"runtime\":\"go\"}").unwrap();

        assert!(storage.dir().join("app-state.json").exists());
        assert_eq!(
            storage.get("app-state").unwrap().as_deref(),
            Some("{\"runtime\":\"go\"}")
        );
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let storage = FileStorage::new(&blocker);
        assert!(storage.set("app-state", "{}").is_err());
    }
}
