//! Key/value storage abstraction backing the undelivered message store
//!
//! Each primitive is individually atomic; nothing here spans two keys.
//! Implementations must offer read-your-writes within a process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use crate::{PushError, Result};

// ----------------------------------------------------------------------------
// Storage Trait
// ----------------------------------------------------------------------------

/// Persistent string key/value storage
pub trait KeyValueStore: Send + Sync {
    /// Store a value under a key, replacing any previous value
    fn put(&self, key: &str, value: String) -> Result<()>;

    /// Retrieve the value stored under a key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// List all keys
    fn keys(&self) -> Result<Vec<String>>;

    /// Check if storage is available and accessible
    fn is_available(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Memory Storage Implementation
// ----------------------------------------------------------------------------

/// In-memory storage implementation for testing and fallback
#[derive(Debug)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<String, String>>,
    available: AtomicBool,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle availability (simulates a locked or unmounted store)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(PushError::storage_error("Storage not available"))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStorage {
    fn put(&self, key: &str, value: String) -> Result<()> {
        self.check_available()?;
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self
            .data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self
            .data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

// ----------------------------------------------------------------------------
// File Storage Implementation
// ----------------------------------------------------------------------------

/// JSON document on disk, rewritten on every mutation
///
/// Writes go to a sibling temp file that is then renamed over the document,
/// so a crash leaves either the old or the new document, never a torn one.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) `<dir>/<namespace>.json`
    pub fn open<P: AsRef<Path>>(dir: P, namespace: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", namespace));

        let data: BTreeMap<String, String> = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = data.len(), "Opened file storage");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn put(&self, key: &str, value: String) -> Result<()> {
        let mut data = self.lock();
        let previous = data.insert(key.to_string(), value);
        if let Err(e) = self.persist(&data) {
            // Keep memory in step with disk
            match previous {
                Some(old) => data.insert(key.to_string(), old),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut data = self.lock();
        if let Some(old) = data.remove(key) {
            if let Err(e) = self.persist(&data) {
                data.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn is_available(&self) -> bool {
        self.path.parent().map(Path::exists).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.put("k", "v".to_string()).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(storage.keys().unwrap(), vec!["k".to_string()]);

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_memory_storage_unavailable() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(storage.put("k", "v".to_string()).is_err());
        assert!(storage.get("k").is_err());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::open(dir.path(), "prefs").unwrap();
            storage.put("NotificationCount", "2".to_string()).unwrap();
            storage.put("gone", "x".to_string()).unwrap();
            storage.remove("gone").unwrap();
        }

        let reopened = FileStorage::open(dir.path(), "prefs").unwrap();
        assert_eq!(
            reopened.get("NotificationCount").unwrap().as_deref(),
            Some("2")
        );
        assert_eq!(reopened.get("gone").unwrap(), None);
        assert!(reopened.path().ends_with("prefs.json"));
        assert!(reopened.is_available());
    }

    #[test]
    fn test_file_storage_rejects_garbage_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefs.json"), "not json").unwrap();
        assert!(matches!(
            FileStorage::open(dir.path(), "prefs"),
            Err(PushError::Serialization(_))
        ));
    }

    #[test]
    fn test_file_storage_rolls_back_when_persist_fails() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("prefs");
        let storage = FileStorage::open(&dir, "prefs").unwrap();
        storage.put("NotificationCount", "1".to_string()).unwrap();
        storage.put("LatestNotificationMsg1", "{}".to_string()).unwrap();

        // Pull the directory out from under the open store
        fs::remove_dir_all(&dir).unwrap();

        assert!(storage.put("NotificationCount", "2".to_string()).is_err());
        assert!(storage.put("LatestNotificationMsg2", "{}".to_string()).is_err());
        assert!(storage.remove("LatestNotificationMsg1").is_err());

        assert_eq!(
            storage.get("NotificationCount").unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(storage.get("LatestNotificationMsg2").unwrap(), None);
        assert_eq!(
            storage.get("LatestNotificationMsg1").unwrap().as_deref(),
            Some("{}")
        );
        assert!(!storage.is_available());
    }
}
