//! Blob key/value stores for local state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::error::{PersistError, PersistResult};

/// A string key/value store.
///
/// Values are opaque text blobs (JSON in practice). Implementations must be
/// usable from a shared reference.
pub trait StateStore: Send + Sync {
    /// Read the blob under `key`, `None` if absent.
    fn read(&self, key: &str) -> PersistResult<Option<String>>;

    /// Replace the blob under `key`.
    fn write(&self, key: &str, value: &str) -> PersistResult<()>;

    /// Delete the blob under `key`. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> PersistResult<()>;
}

/// One `<key>.json` file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Store files under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory (`~/.local/share/modemsync`).
    pub fn default_location() -> PersistResult<Self> {
        let base = dirs::data_dir().ok_or(PersistError::NoStateDirectory)?;
        Ok(Self::new(base.join("modemsync")))
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PersistResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StateStore for FileStateStore {
    fn read(&self, key: &str) -> PersistResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Read { path, source: e }),
        }
    }

    fn write(&self, key: &str, value: &str) -> PersistResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| PersistError::Write {
            path: self.dir.clone(),
            source: e,
        })?;

        // Readers never see a half-written file.
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value).map_err(|e| PersistError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| PersistError::Write {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote state {:?}", path);
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::Write { path, source: e }),
        }
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self, key: &str) -> PersistResult<Option<String>> {
        Ok(self.blobs().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> PersistResult<()> {
        self.blobs().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistResult<()> {
        self.blobs().remove(key);
        Ok(())
    }
}
