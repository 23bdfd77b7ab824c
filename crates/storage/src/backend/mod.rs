//! Cache backend trait and implementations.
//!
//! This module defines the `CacheBackend` trait, the read/hit/write protocol
//! the compression pipeline speaks to whatever holds previously compressed
//! output (a directory on disk, memory in tests, a read-only view in CI).

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalCache;
#[cfg(feature = "mock")]
pub use self::mock::MockCache;
pub use self::ro::ReadOnlyCache;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for cache backends.
///
/// All operations are asynchronous so that a cache lookup never blocks the
/// other files of a build that are being processed at the same time.
///
/// # Keys
/// Keys are flat names (no directories). Implementations must validate them
/// with [`validate_key`](crate::validate_key) before use.
///
/// # Examples
///
/// ```
/// use tinyimg_storage::{backend::CacheBackend, error::Result};
///
/// async fn compressed_or_original(cache: &dyn CacheBackend, key: &str, original: Vec<u8>) -> Result<Vec<u8>> {
///     Ok(cache.read_cache_file(key).await?.unwrap_or(original))
/// }
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Where entries live. Descriptive only (log messages); callers must not
    /// read or write beneath it directly.
    fn cache_dir(&self) -> &Path;

    /// Read the entry stored under `key`.
    ///
    /// A missing entry is `Ok(None)`, not an error: a miss is the normal
    /// outcome of the first build.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tinyimg_storage::{backend::CacheBackend, error::Result};
    /// # async fn example(cache: &dyn CacheBackend) -> Result<()> {
    /// match cache.read_cache_file("0123abcd-logo.png").await? {
    ///     Some(bytes) => println!("hit: {} bytes", bytes.len()),
    ///     None => println!("miss"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn read_cache_file(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous entry.
    ///
    /// # Notes
    /// - Implementations should make the write appear atomically to
    ///   concurrent readers (no torn entries).
    async fn cache_file(&self, data: &[u8], key: &str) -> Result<()>;
}
