//! Durable key/value storage for the session across restarts.
//!
//! The session survives a restart by writing four string entries into a
//! [`PersistenceCache`]: `uid`, `email`, `token`, and `isAdmin`. The
//! [`SessionStore`](crate::SessionStore) is the only reader (once, at
//! startup) and the only writer (on every identity change).
//!
//! Two backends ship here:
//!
//! - [`MemoryCache`]: shared in-process map. Clones see the same entries,
//!   which lets tests "restart" a store against the cache the last one
//!   left behind.
//! - [`FileCache`]: a small JSON file, rewritten atomically on each change.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::CacheError;

/// The entries the session persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Uid,
    Email,
    Token,
    IsAdmin,
}

impl CacheKey {
    /// Every key, in write order.
    pub const ALL: [CacheKey; 4] = [
        CacheKey::Uid,
        CacheKey::Email,
        CacheKey::Token,
        CacheKey::IsAdmin,
    ];

    /// The storage key string.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::Uid => "uid",
            CacheKey::Email => "email",
            CacheKey::Token => "token",
            CacheKey::IsAdmin => "isAdmin",
        }
    }
}

/// A string key/value store that outlives the process.
///
/// Implementations are owned by one [`SessionStore`](crate::SessionStore)
/// actor, so they take `&mut self` and need no internal locking of their
/// own.
pub trait PersistenceCache: Send + 'static {
    /// Reads one entry. A missing entry is `Ok(None)`.
    fn get(&self, key: CacheKey) -> Result<Option<String>, CacheError>;

    /// Writes one entry, replacing any previous value.
    fn set(&mut self, key: CacheKey, value: &str) -> Result<(), CacheError>;

    /// Deletes one entry. Removing a missing entry is not an error.
    fn remove(&mut self, key: CacheKey) -> Result<(), CacheError>;
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// An in-process cache. Cloning shares the underlying entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<CacheKey, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of entries present.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl PersistenceCache for MemoryCache {
    fn get(&self, key: CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.entries().get(&key).cloned())
    }

    fn set(&mut self, key: CacheKey, value: &str) -> Result<(), CacheError> {
        self.entries().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: CacheKey) -> Result<(), CacheError> {
        self.entries().remove(&key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileCache
// ---------------------------------------------------------------------------

/// A cache stored as one JSON object in a file.
///
/// Entries are loaded once by [`open`](Self::open). Each change rewrites
/// the whole file through a temporary sibling and a rename, so a crash
/// mid-write leaves either the old file or the new one.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    /// Opens the cache at `path`, creating parent directories as needed.
    /// A missing file is an empty cache.
    ///
    /// # Errors
    /// - [`CacheError::Io`] if the file or its directory can't be read
    /// - [`CacheError::Corrupt`] if the file isn't a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened session cache");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CacheError> {
        let contents = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PersistenceCache for FileCache {
    fn get(&self, key: CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key.as_str()).cloned())
    }

    fn set(&mut self, key: CacheKey, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.as_str().to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: CacheKey) -> Result<(), CacheError> {
        if self.entries.remove(key.as_str()).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strings() {
        let names: Vec<_> = CacheKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["uid", "email", "token", "isAdmin"]);
    }

    #[test]
    fn test_memory_cache_clones_share_entries() {
        let mut cache = MemoryCache::new();
        let other = cache.clone();

        cache.set(CacheKey::Token, "t1").unwrap();

        assert_eq!(other.get(CacheKey::Token).unwrap().as_deref(), Some("t1"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_memory_cache_remove_missing_is_ok() {
        let mut cache = MemoryCache::new();

        cache.remove(CacheKey::Uid).unwrap();

        assert!(cache.is_empty());
    }

    #[test]
    fn test_file_cache_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let cache = FileCache::open(dir.path().join("session.json")).unwrap();

        for key in CacheKey::ALL {
            assert_eq!(cache.get(key).unwrap(), None);
        }
    }

    #[test]
    fn test_file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut cache = FileCache::open(&path).unwrap();
        cache.set(CacheKey::Email, "admin@techinf.com").unwrap();
        cache.set(CacheKey::IsAdmin, "true").unwrap();
        drop(cache);

        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(
            reopened.get(CacheKey::Email).unwrap().as_deref(),
            Some("admin@techinf.com")
        );
        assert_eq!(reopened.get(CacheKey::IsAdmin).unwrap().as_deref(), Some("true"));
        assert_eq!(reopened.get(CacheKey::Token).unwrap(), None);
    }

    #[test]
    fn test_file_cache_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut cache = FileCache::open(&path).unwrap();
        cache.set(CacheKey::Token, "t").unwrap();
        cache.remove(CacheKey::Token).unwrap();

        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(reopened.get(CacheKey::Token).unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_cache_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let result = FileCache::open(&path);

        assert!(matches!(result, Err(CacheError::Corrupt(_))));
    }
}
