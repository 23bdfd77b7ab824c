//! Ledger Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A ledger error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The ledger file couldn't be read or created.
    #[display("could not load ledger: {}", _0.display())]
    Load(#[error(not(source))] PathBuf),
    /// A record couldn't be appended to the ledger file.
    #[display("could not append to ledger: {}", _0.display())]
    Append(#[error(not(source))] PathBuf),
    /// A line isn't a ledger record.
    #[display("invalid ledger record: {_0}")]
    InvalidRecord(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load(_) | Self::Append(_))
    }
}
