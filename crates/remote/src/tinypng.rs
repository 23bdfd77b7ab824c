//! TinyPNG web endpoint client.
//!
//! Two round-trips: the image is POSTed as the raw request body and the
//! service answers with a JSON result descriptor. On success the descriptor
//! points at the compressed image, which is then fetched with a GET.

use crate::error::{ErrorKind, Result, Stage};
use crate::{Compressed, Compressor, Outcome};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_ENDPOINT: &str = "https://tinypng.com/web/shrink";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const USER_AGENT: &str = "Mozilla/5.0";
const REFERER_VALUE: &str = "https://tinypng.com/";

/// Client for the TinyPNG web endpoint.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tinyimg_remote::{Compressor, Outcome, TinyPngClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TinyPngClient::new()?.with_timeout(Duration::from_secs(30));
/// match client.compress(&std::fs::read("logo.png")?).await {
///     Outcome::Success(compressed) => println!("{} bytes", compressed.output_size),
///     Outcome::Failure { reason } => println!("not compressed: {reason}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TinyPngClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl TinyPngClient {
    /// Create a client for the public web endpoint.
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create a client for a different (compatible) endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("dnt", HeaderValue::from_static("1"));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_VALUE));
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Per-request timeout, applied to each of the two round-trips.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn shrink(&self, data: &[u8]) -> Result<Compressed> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| transport_error(Stage::Submit, &e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| transport_error(Stage::Submit, &e))?;
        let descriptor = Descriptor::interpret(status, &body)?;
        tracing::debug!(url = %descriptor.url, input = ?descriptor.input_size, output = ?descriptor.output_size, "Compression accepted; downloading result");

        let response = self
            .client
            .get(&descriptor.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(Stage::Download, &e))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Rejected(
                Stage::Download,
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown").to_string()
            ));
        }
        let bytes = response.bytes().await.map_err(|e| transport_error(Stage::Download, &e))?;
        Ok(descriptor.into_compressed(bytes.to_vec(), data.len() as u64))
    }
}

#[async_trait]
impl Compressor for TinyPngClient {
    fn name(&self) -> &str {
        "tinypng"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, bytes = data.len()))]
    async fn compress(&self, data: &[u8]) -> Outcome {
        match self.shrink(data).await {
            Ok(compressed) => Outcome::Success(compressed),
            Err(e) => {
                tracing::debug!(retryable = e.is_retryable(), "Remote compression failed: {}", *e);
                Outcome::failure((*e).to_string())
            },
        }
    }
}

fn transport_error(stage: Stage, e: &reqwest::Error) -> ErrorKind {
    if e.is_timeout() {
        ErrorKind::Timeout(stage)
    } else {
        ErrorKind::Transport(stage, e.to_string())
    }
}

/// The parts of the result descriptor we act on. Only the URL is required;
/// the sizes are for reporting.
#[derive(Debug, Clone, PartialEq)]
struct Descriptor {
    input_size: Option<u64>,
    output_size: Option<u64>,
    ratio: Option<f64>,
    url: String,
}

#[derive(Deserialize)]
struct RawDescriptor {
    input: Option<RawInput>,
    output: Option<RawOutput>,
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawInput {
    size: Option<u64>,
}

#[derive(Deserialize)]
struct RawOutput {
    size: Option<u64>,
    ratio: Option<f64>,
    url: Option<String>,
}

impl Descriptor {
    /// Turn the submit response into something downloadable, or the reason
    /// it isn't.
    fn interpret(status: u16, body: &[u8]) -> Result<Self> {
        let parsed = serde_json::from_slice::<RawDescriptor>(body);
        if !(200..300).contains(&status) {
            // Rejections usually still carry a JSON body explaining why.
            let reason = parsed
                .ok()
                .and_then(|raw| raw.message.or(raw.error))
                .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
            exn::bail!(ErrorKind::Rejected(Stage::Submit, status, reason));
        }
        let raw = parsed.or_raise(|| ErrorKind::MalformedDescriptor("body is not a result descriptor".to_string()))?;
        let output = raw.output.ok_or_raise(|| ErrorKind::MissingOutputUrl)?;
        let url = output.url.filter(|url| !url.is_empty()).ok_or_raise(|| ErrorKind::MissingOutputUrl)?;
        Ok(Self {
            input_size: raw.input.and_then(|input| input.size),
            output_size: output.size,
            ratio: output.ratio,
            url,
        })
    }

    /// Attach the downloaded bytes. Sizes the service left out are taken
    /// from what was actually sent and received.
    fn into_compressed(self, data: Vec<u8>, submitted: u64) -> Compressed {
        let derived = Compressed::from_sizes(data, self.input_size.unwrap_or(submitted));
        match (self.output_size, self.ratio) {
            (Some(output_size), Some(ratio)) => Compressed { output_size, ratio, ..derived },
            (Some(output_size), None) if derived.input_size > 0 => Compressed {
                output_size,
                ratio: output_size as f64 / derived.input_size as f64,
                ..derived
            },
            (None, Some(ratio)) => Compressed { ratio, ..derived },
            _ => derived,
        }
    }
}
