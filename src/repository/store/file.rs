use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::repository::errors::RepositoryError;
use crate::usecase::contracts::{StoreKey, TokenStore};

/// JSON file store keyed by the cookie names (`access_token`, ...).
///
/// The file is read once on open and rewritten on every change with 0600
/// permissions on unix.
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| {
                RepositoryError::Io(format!("failed to read {}: {}", path.display(), e))
            })?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| {
                    RepositoryError::Serialization(format!(
                        "failed to parse {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "token store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                RepositoryError::Io(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| {
            RepositoryError::Io(format!("failed to open {}: {}", self.path.display(), e))
        })?;
        file.write_all(contents.as_bytes()).map_err(|e| {
            RepositoryError::Io(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.entries().get(key.as_str()).cloned()
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), RepositoryError> {
        let mut entries = self.entries();
        entries.insert(key.as_str().to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: StoreKey) -> Result<(), RepositoryError> {
        let mut entries = self.entries();
        if entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }

    fn clear(&self) -> Result<(), RepositoryError> {
        let mut entries = self.entries();
        entries.clear();
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path().join("session.json")).unwrap();

        assert_eq!(store.get(StoreKey::AccessToken), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(StoreKey::AccessToken, "A").unwrap();
        store.set(StoreKey::RefreshToken, "R").unwrap();
        drop(store);

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(StoreKey::AccessToken), Some("A".to_string()));
        assert_eq!(reopened.get(StoreKey::RefreshToken), Some("R".to_string()));
    }

    #[test]
    fn test_file_uses_cookie_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(StoreKey::IsNewUser, "true").unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("is_new_user"), Some(&"true".to_string()));
    }

    #[test]
    fn test_clear_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(StoreKey::AccessToken, "A").unwrap();
        store.clear().unwrap();

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(StoreKey::AccessToken), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let result = FileTokenStore::open(&path);

        assert!(matches!(result, Err(RepositoryError::Serialization(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(StoreKey::AccessToken, "A").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
