//! In-memory cache backend for testing.

use crate::CacheBackend;
use crate::error::Result;
use crate::path::validate_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory cache backend for testing.
///
/// Entries are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods operate on `&self` without external synchronisation. Reads and
/// writes are counted so tests can assert on the protocol, not just the
/// final state.
///
/// # Examples
///
/// ```
/// use tinyimg_storage::backend::{CacheBackend, MockCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = MockCache::with_entries([("abc-logo.png", b"tiny")]);
/// assert!(cache.read_cache_file("abc-logo.png").await?.is_some());
///
/// cache.cache_file(b"smaller", "def-icon.png").await?;
/// assert_eq!(cache.writes(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockCache {
    name: String,
    dir: PathBuf,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockCache {
    /// Create a mock cache pre-populated with entries.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in entries {
            let key = key.as_ref();
            let Ok(validated) = validate_key(key) else {
                // The panic here is DELIBERATE. MockCache is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockCache::with_entries: invalid key {key}");
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            dir: PathBuf::from("memory"),
            storage: RwLock::new(map),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of `read_cache_file` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `cache_file` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of a single entry, bypassing the counters.
    pub async fn entry(&self, key: &str) -> Option<Vec<u8>> {
        let key = validate_key(key).ok()?;
        self.storage.read().await.get(&key).cloned()
    }

    /// Number of entries currently stored.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }
}
impl Default for MockCache {
    fn default() -> Self {
        let entries: [(&str, &[u8]); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl CacheBackend for MockCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn cache_dir(&self) -> &Path {
        &self.dir
    }

    async fn read_cache_file(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        Ok(self.storage.read().await.get(&key).cloned())
    }

    async fn cache_file(&self, data: &[u8], key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        self.storage.write().await.insert(key, data.to_vec());
        Ok(())
    }
}
