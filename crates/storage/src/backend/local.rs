//! Local filesystem cache backend.
//!
//! One file per entry inside a single cache directory, accessed via
//! `tokio::fs` for async I/O.

use crate::error::ErrorKind;
use crate::{CacheBackend, error::Result, path::validate_key};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Local filesystem cache backend.
///
/// # Examples
///
/// ```no_run
/// use tinyimg_storage::backend::LocalCache;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = LocalCache::new("local", "/home/me/.cache/tinyimg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalCache {
    name: String,
    /// Directory holding every entry
    root: PathBuf,
}
impl LocalCache {
    /// Create a new local cache backend, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidDirectory(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidDirectory(root));
            }
        } else {
            // Use non-async here; it'll only happen once per build and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    /// Absolute location of the entry for `key`.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl CacheBackend for LocalCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn cache_dir(&self) -> &Path {
        &self.root
    }

    async fn read_cache_file(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e, &path).into()),
        }
    }

    async fn cache_file(&self, data: &[u8], key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        let root = self.root.clone();
        let size = data.len();
        let data = data.to_vec();
        // Stage next to the final location so the rename never crosses a
        // filesystem boundary; readers see either the old entry or the new one.
        let staged = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&root).map_err(|e| Self::map_io_error(e, &root))?;
            tmp.write_all(&data).map_err(|e| Self::map_io_error(e, tmp.path()))?;
            tmp.persist(&path).map_err(|e| Self::map_io_error(e.error, &path))?;
            Ok(())
        })
        .await
        .or_raise(|| ErrorKind::BackendError("cache write task did not complete".to_string()))?;
        staged?;
        tracing::trace!(cache = %self.name, key, bytes = size, "Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalCache::new("name", temp_dir.path()).is_ok());
        assert!(LocalCache::new("name", "relative/path").is_err());
        assert!(LocalCache::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a/b/cache");
        let cache = LocalCache::new("name", &nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(cache.cache_dir(), nested);
    }

    #[test]
    fn test_new_rejects_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"data").unwrap();
        let err = LocalCache::new("name", &file).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidDirectory(_)));
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new("name", temp_dir.path()).unwrap();
        assert_eq!(cache.read_cache_file("abc-logo.png").await.unwrap(), None);
        assert!(!temp_dir.path().join("abc-logo.png").exists());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new("name", temp_dir.path()).unwrap();
        cache.cache_file(b"compressed", "abc-logo.png").await.unwrap();
        assert_eq!(cache.read_cache_file("abc-logo.png").await.unwrap().as_deref(), Some(&b"compressed"[..]));
        assert_eq!(std::fs::read(temp_dir.path().join("abc-logo.png")).unwrap(), b"compressed");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new("name", temp_dir.path()).unwrap();
        cache.cache_file(b"first", "abc-logo.png").await.unwrap();
        cache.cache_file(b"second", "abc-logo.png").await.unwrap();
        assert_eq!(cache.read_cache_file("abc-logo.png").await.unwrap().unwrap(), b"second");
        // No staging files left behind.
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_key_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new("name", temp_dir.path()).unwrap();
        assert!(cache.read_cache_file("../etc/passwd").await.is_err());
        assert!(cache.cache_file(b"data", "../escape.png").await.is_err());
        assert!(cache.cache_file(b"data", "nested/key.png").await.is_err());
        let err = cache.read_cache_file("").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }
}
