//! Remote image compression.
//!
//! A [`Compressor`] takes the raw bytes of an image and hands back an
//! [`Outcome`]: either the compressed bytes along with the sizes reported by
//! the service, or a human-readable reason why compression didn't happen.
//! Nothing a remote service does (timeouts, garbage JSON, HTTP errors) is
//! raised past this boundary; a failed compression is an expected outcome of
//! a build, not an error of it.

pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod tinypng;

#[cfg(feature = "mock")]
pub use crate::mock::MockCompressor;
pub use crate::tinypng::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, TinyPngClient};
use async_trait::async_trait;
use std::sync::Arc;

pub type CompressorHandle = Arc<dyn Compressor + Send + Sync>;

/// Unified interface for remote compression services.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Name of the service, used for logging only.
    fn name(&self) -> &str;

    /// Compress `data`.
    ///
    /// The returned future resolves only once the compressed bytes are fully
    /// downloaded; a [`Success`](Outcome::Success) always carries the final
    /// bytes, never a promise of them.
    async fn compress(&self, data: &[u8]) -> Outcome;
}

/// Result of asking a remote service to compress an image.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Compressed),
    Failure { reason: String },
}
impl Outcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure { reason: reason.into() }
    }
}

/// Compressed output along with the service's own accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub data: Vec<u8>,
    /// Input size as reported by the service.
    pub input_size: u64,
    /// Output size as reported by the service.
    pub output_size: u64,
    /// `output_size / input_size`.
    pub ratio: f64,
}
impl Compressed {
    /// Build from raw sizes when the service doesn't report them (or for
    /// tests), deriving the ratio.
    pub fn from_sizes(data: Vec<u8>, input_size: u64) -> Self {
        let output_size = data.len() as u64;
        let ratio = if input_size == 0 { 1.0 } else { output_size as f64 / input_size as f64 };
        Self { data, input_size, output_size, ratio }
    }

    /// Percentage of the input saved, e.g. `60.0` for 1000 → 400 bytes.
    pub fn saved_percent(&self) -> f64 {
        100.0 - 100.0 * self.ratio
    }
}
