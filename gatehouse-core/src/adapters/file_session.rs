//! File-backed session store
//!
//! Keeps one client's session as a flat JSON object on disk so that a CLI
//! login survives between invocations. Access is serialized with an advisory
//! lock on a sibling `.lock` file.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::SessionStore;

type Values = BTreeMap<String, String>;

/// Session context persisted to a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    fn read_values(&self) -> Result<Values> {
        if !self.path.exists() {
            return Ok(Values::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Values::new());
        }
        // A corrupt file reads as an empty session rather than a fault
        Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
            Values::new()
        }))
    }

    fn write_values(&self, values: &Values) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut options = OpenOptions::new();
            options.create(true).write(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);
            let mut file = options.open(&tmp_path)?;
            file.write_all(serde_json::to_string_pretty(values)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn with_exclusive<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .map_err(|e| Error::session(format!("Failed to lock session file: {}", e)))?;
        let result = f(self);
        lock.unlock()
            .map_err(|e| Error::session(format!("Failed to unlock session file: {}", e)))?;
        result
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let lock = self.open_lock()?;
        lock.lock_shared()
            .map_err(|e| Error::session(format!("Failed to lock session file: {}", e)))?;
        let values = self.read_values();
        lock.unlock()
            .map_err(|e| Error::session(format!("Failed to unlock session file: {}", e)))?;
        Ok(values?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_exclusive(|store| {
            let mut values = store.read_values()?;
            values.insert(key.to_string(), value.to_string());
            store.write_values(&values)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_exclusive(|store| {
            if store.path.exists() {
                fs::remove_file(&store.path)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        FileSessionStore::new(&path).set("user_id", "abc").unwrap();
        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.get("user_id").unwrap(), Some("abc".to_string()));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        store.clear().unwrap();
        store.set("session_token", "t").unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get("session_token").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get("user_id").unwrap(), None);
        store.set("user_id", "abc").unwrap();
        assert_eq!(store.get("user_id").unwrap(), Some("abc".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.set("session_token", "secret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
