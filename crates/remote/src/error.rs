//! Remote Error Types
//!
//! These never leave the crate as errors: [`Compressor::compress`](crate::Compressor::compress)
//! turns them into [`Outcome::Failure`](crate::Outcome::Failure) reasons. They
//! exist so that the reason strings are consistent and so that constructing a
//! client (which *can* fail) has something to return.

use derive_more::{Display, Error};

/// A remote error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two round-trips was in flight.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[display("submit")]
    Submit,
    #[display("download")]
    Download,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client couldn't be constructed.
    #[display("could not build HTTP client")]
    Client,
    /// Connection-level failure (DNS, refused, reset, TLS, ...).
    #[display("{_0} request failed: {_1}")]
    Transport(#[error(not(source))] Stage, #[error(not(source))] String),
    /// The request didn't complete within the configured timeout.
    #[display("{_0} request timed out")]
    Timeout(#[error(not(source))] Stage),
    /// The service answered with a non-success status.
    #[display("{_0} rejected with HTTP {_1}: {_2}")]
    Rejected(#[error(not(source))] Stage, #[error(not(source))] u16, #[error(not(source))] String),
    /// The result descriptor wasn't the JSON shape we expect.
    #[display("malformed result descriptor: {_0}")]
    MalformedDescriptor(#[error(not(source))] String),
    /// Compression reportedly succeeded, but there's nothing to download.
    #[display("compress success, output or url not exist")]
    MissingOutputUrl,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(..) | Self::Timeout(_) => true,
            Self::Rejected(_, status, _) => *status == 429 || *status >= 500,
            Self::Client | Self::MalformedDescriptor(_) | Self::MissingOutputUrl => false,
        }
    }
}
