//! Persisted access-token slot.
//!
//! The token is plain client state: it is attached to outgoing requests and
//! replaced or cleared by the auth calls, with no expiry tracking. It is not a
//! trust boundary.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use super::error::ApiError;

/// Storage key the token lives under.
pub const TOKEN_KEY: &str = "token";

/// A single-slot store for the bearer access token.
///
/// Concurrent writers are not coordinated; the last write wins.
pub trait TokenStore: Send + Sync + fmt::Debug + 'static {
    fn get(&self) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the slot cannot be written.
    fn set(&self, token: &str) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the slot cannot be written.
    fn clear(&self) -> Result<(), ApiError>;
}

/// Process-local token slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: &str) -> Result<(), ApiError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token slot backed by a small JSON key-value file, in the manner of browser
/// local storage: `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: MemoryTokenStore,
}

impl FileTokenStore {
    /// Opens the store at `path`, loading any token already persisted there.
    ///
    /// A missing or unreadable file is treated as an empty slot.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = MemoryTokenStore::new();

        if let Some(token) = read_entries(&path).remove(TOKEN_KEY) {
            // Writing to the in-memory slot cannot fail.
            let _ = cached.set(&token);
        }

        Self { path, cached }
    }

    /// Default location: `<data dir>/apidesk/storage.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("apidesk").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, token: Option<&str>) -> Result<(), ApiError> {
        let mut entries = read_entries(&self.path);
        match token {
            Some(token) => {
                entries.insert(TOKEN_KEY.to_string(), token.to_string());
            }
            None => {
                entries.remove(TOKEN_KEY);
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ApiError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ApiError::Storage(e.to_string()))
    }
}

fn read_entries(path: &Path) -> HashMap<String, String> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.cached.get()
    }

    fn set(&self, token: &str) -> Result<(), ApiError> {
        self.persist(Some(token))?;
        self.cached.set(token)
    }

    fn clear(&self) -> Result<(), ApiError> {
        self.persist(None)?;
        self.cached.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);

        store.set("abc").expect("memory set");
        assert_eq!(store.get().as_deref(), Some("abc"));

        store.set("def").expect("memory set");
        assert_eq!(store.get().as_deref(), Some("def"));

        store.clear().expect("memory clear");
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let a = MemoryTokenStore::new();
        let b = a.clone();
        a.set("shared").expect("memory set");
        assert_eq!(b.get().as_deref(), Some("shared"));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("storage.json");

        let store = FileTokenStore::open(&path);
        assert_eq!(store.get(), None);
        store.set("persisted-token").expect("file set");

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.get().as_deref(), Some("persisted-token"));

        reopened.clear().expect("file clear");
        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.get(), None);
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"theme":"dark"}"#).expect("seed file");

        let store = FileTokenStore::open(&path);
        store.set("t").expect("file set");
        store.clear().expect("file clear");

        let entries = read_entries(&path);
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        assert!(!entries.contains_key(TOKEN_KEY));
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").expect("seed file");

        let store = FileTokenStore::open(&path);
        assert_eq!(store.get(), None);
    }
}
