//! Key/value persistence for credentials and preferences.
//!
//! [`KeyValueStore`] is the raw backend and may fail.  [`TokenStore`] wraps
//! a backend and never fails: a storage error on write is a no-op, a
//! storage error on read is an absent value.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::observability::STORAGE_ERRORS;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "aura.auth.token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "aura.auth.refresh";

/// A string key/value backend.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Removes `key`.  Removing an absent key succeeds.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Process-lifetime storage; the equivalent of a browser tab's session storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> io::Error {
    io::Error::other("storage lock poisoned")
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.remove(key);
        Ok(())
    }
}

/// Storage that survives restarts: one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`.  The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key {key:?}"),
            ));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Failure-tolerant access to the persisted access and refresh tokens.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Reads `key`, treating any storage failure as absent.
    pub fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                STORAGE_ERRORS.click();
                tracing::debug!(key, error = %err, "token storage read failed");
                None
            }
        }
    }

    /// Writes `value` under `key`, or removes `key` when `value` is `None`.
    /// Storage failures are ignored.
    pub fn write(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) if !value.is_empty() => self.backend.set(key, value),
            _ => self.backend.remove(key),
        };
        if let Err(err) = result {
            STORAGE_ERRORS.click();
            tracing::debug!(key, error = %err, "token storage write failed");
        }
    }

    /// The persisted access token.
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// The persisted refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Persists both tokens; `None` erases.
    pub fn store(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        self.write(ACCESS_TOKEN_KEY, access_token);
        self.write(REFRESH_TOKEN_KEY, refresh_token);
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::BrokenStore;
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(tokens.access_token(), None);
        tokens.store(Some("a"), Some("r"));
        assert_eq!(tokens.access_token().as_deref(), Some("a"));
        assert_eq!(tokens.refresh_token().as_deref(), Some("r"));
        tokens.store(Some("b"), None);
        assert_eq!(tokens.access_token().as_deref(), Some("b"));
        assert_eq!(tokens.refresh_token(), None);
    }

    #[test]
    fn broken_backend_never_fails() {
        let tokens = TokenStore::new(Arc::new(BrokenStore));
        tokens.write(ACCESS_TOKEN_KEY, Some("a"));
        tokens.write(ACCESS_TOKEN_KEY, None);
        assert_eq!(tokens.read(ACCESS_TOKEN_KEY), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!("aura-store-{}", std::process::id()));
        let first = TokenStore::new(Arc::new(FileStore::new(&dir)));
        first.store(Some("persisted"), None);

        let second = TokenStore::new(Arc::new(FileStore::new(&dir)));
        assert_eq!(second.access_token().as_deref(), Some("persisted"));
        second.store(None, None);
        assert_eq!(first.access_token(), None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_store_temp_file_is_per_key() {
        let dir = std::env::temp_dir().join(format!("aura-store-tmp-{}", std::process::id()));
        fs::create_dir_all(dir.join("aura.auth.tmp")).unwrap();
        let store = FileStore::new(&dir);
        store.set(ACCESS_TOKEN_KEY, "a").unwrap();
        store.set(REFRESH_TOKEN_KEY, "r").unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r"));
        assert!(!dir.join(format!("{ACCESS_TOKEN_KEY}.tmp")).exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_store_rejects_path_keys() {
        let store = FileStore::new(std::env::temp_dir());
        assert!(store.get("../etc/passwd").is_err());
        assert!(store.set("", "x").is_err());
    }
}
