//! Atomic JSON file operations.
//!
//! A thin layer for safe concurrent access to single-document JSON files:
//! atomic tmp-file + rename writes, explicit fsync, and an exclusive file
//! lock for transactional read-modify-write updates.

use repose_core::error::{ReposeError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to an atomic JSON document.
///
/// - **Atomicity**: updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: [`Self::locked`] holds an exclusive file lock across a
///   read-modify-write
/// - **Durability**: explicit fsync before rename
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the document.
    ///
    /// Returns `Ok(None)` when the file does not exist or is empty.
    ///
    /// # Errors
    ///
    /// IO failures map to [`ReposeError::TransientStore`]; undecodable
    /// content maps to [`ReposeError::Parse`].
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| ReposeError::transient_store(format!("read {:?}: {e}", self.path)))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let data: T = serde_json::from_str(&content)
            .map_err(|e| ReposeError::parse(format!("decode {:?}: {e}", self.path)))?;
        Ok(Some(data))
    }

    /// Serializes and writes the document atomically.
    ///
    /// # Errors
    ///
    /// IO failures map to [`ReposeError::TransientStore`].
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ReposeError::transient_store(format!("create dir {parent:?}: {e}"))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| ReposeError::internal(format!("serialize {:?}: {e}", self.path)))?;

        let tmp_path = self.temp_path()?;
        let write = || -> std::io::Result<()> {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(json.as_bytes())?;
            tmp_file.sync_all()?;
            drop(tmp_file);
            fs::rename(&tmp_path, &self.path)
        };
        write().map_err(|e| ReposeError::transient_store(format!("write {:?}: {e}", self.path)))
    }

    /// Runs `f` under an exclusive file lock.
    ///
    /// The lock covers the whole read-modify-write, which is what makes
    /// version checks against this file race-free across processes.
    pub fn locked<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let _lock = FileLock::acquire(&self.path)?;
        f(self)
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| ReposeError::internal(format!("{:?} has no parent", self.path)))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| ReposeError::internal(format!("{:?} has no file name", self.path)))?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ReposeError::transient_store(format!("create dir {parent:?}: {e}"))
                })?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ReposeError::transient_store(format!("open lock {lock_path:?}: {e}")))?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|e| {
                ReposeError::transient_store(format!("acquire lock {lock_path:?}: {e}"))
            })?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle is dropped; removing the
        // lock file is best effort.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        value: u32,
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicJsonFile<Doc> = AtomicJsonFile::new(dir.path().join("doc.json"));
        assert_eq!(file.load().unwrap(), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicJsonFile<Doc> = AtomicJsonFile::new(dir.path().join("sub/doc.json"));
        file.save(&Doc { value: 7 }).unwrap();
        assert_eq!(file.load().unwrap(), Some(Doc { value: 7 }));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "not json").unwrap();
        let file: AtomicJsonFile<Doc> = AtomicJsonFile::new(path);
        assert!(file.load().unwrap_err().is_parse());
    }

    #[test]
    fn locked_update_applies_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let file: AtomicJsonFile<Doc> = AtomicJsonFile::new(dir.path().join("doc.json"));
        file.save(&Doc { value: 1 }).unwrap();
        file.locked(|f| {
            let mut doc = f.load()?.unwrap();
            doc.value += 1;
            f.save(&doc)
        })
        .unwrap();
        assert_eq!(file.load().unwrap(), Some(Doc { value: 2 }));
    }
}
