//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Access denied to the cache directory or one of its entries
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Key is empty, contains separators or would escape the cache directory
    #[display("invalid cache key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Cache directory is unusable (not absolute, not a directory, ...)
    #[display("invalid cache directory: {}", _0.display())]
    InvalidDirectory(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}
