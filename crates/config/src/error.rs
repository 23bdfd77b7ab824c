//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration file named explicitly doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A configuration file named explicitly has an extension we can't parse.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged configuration couldn't be deserialized.
    #[display("could not read configuration")]
    Extract,
    /// A value was read but is out of range.
    #[display("invalid configuration value for `{_0}`")]
    Invalid(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Configuration errors always need someone to edit something first.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
