//! Read-only cache backend.
//!
//! Wraps another backend and prevents writes from executing, while still
//! indicating success on return. Lets a build consume a warm cache without
//! populating it.

use async_trait::async_trait;
use std::path::Path;

use crate::{CacheBackend, CacheHandle, error::Result};

/// Read-only cache backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyCache {
    inner: CacheHandle,
}
impl ReadOnlyCache {
    pub fn new(inner: CacheHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CacheBackend for ReadOnlyCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_dir(&self) -> &Path {
        self.inner.cache_dir()
    }

    async fn read_cache_file(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read_cache_file(key).await
    }

    async fn cache_file(&self, data: &[u8], key: &str) -> Result<()> {
        tracing::info!(cache = %self.name(), key, bytes = data.len(), "Skipping cache write during read-only mode");
        Ok(())
    }
}
