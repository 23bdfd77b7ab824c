//! Scripted compressor for testing.

use crate::{Compressed, Compressor, Outcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Script = Box<dyn Fn(&[u8]) -> Outcome + Send + Sync>;

/// Compressor that never touches the network.
///
/// Every call is counted so tests can assert that a cache hit really did
/// skip the remote round-trip.
///
/// # Examples
///
/// ```
/// use tinyimg_remote::{Compressor, MockCompressor, Outcome};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let compressor = MockCompressor::returning(vec![0; 400]);
/// let Outcome::Success(compressed) = compressor.compress(&[0; 1000]).await else { panic!() };
/// assert_eq!(compressed.output_size, 400);
/// assert_eq!(compressor.calls(), 1);
/// # }
/// ```
pub struct MockCompressor {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCompressor {
    pub fn new(script: impl Fn(&[u8]) -> Outcome + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeed with `output`, whatever the input.
    pub fn returning(output: impl Into<Vec<u8>>) -> Self {
        let output = output.into();
        Self::new(move |input| Outcome::Success(Compressed::from_sizes(output.clone(), input.len() as u64)))
    }

    /// Always fail with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move |_| Outcome::failure(reason.clone()))
    }

    /// Sleep before answering, simulating network latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compressor for MockCompressor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compress(&self, data: &[u8]) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(data)
    }
}
