//! Pipeline Error Types
//!
//! Only the problems that make a single file's result untrustworthy end up
//! here. A remote service refusing to compress, or a cache that can't be
//! read, degrade the result instead of failing it.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source file couldn't be read.
    #[display("could not read source file: {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// The ledger couldn't be loaded or appended to.
    #[display("ledger unavailable")]
    Ledger,
    /// Archiving the original or replacing it in place failed part-way.
    #[display("could not archive or replace: {}", _0.display())]
    Archive(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Read(_) | Self::Ledger | Self::Archive(_) => true,
        }
    }
}
