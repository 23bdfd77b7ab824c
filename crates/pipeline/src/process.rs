use crate::archive::replace_and_archive;
use crate::error::{ErrorKind, Result};
use crate::file::SourceFile;
use crate::options::{Options, ProcessConfig};
use exn::ResultExt;
use tinyimg_ledger::Ledger;
use tinyimg_remote::{CompressorHandle, Outcome as RemoteOutcome};
use tinyimg_storage::CacheHandle;
use tracing::instrument;

/// What happened to a file, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Matched the ignore rule; nothing was looked at.
    Ignored,
    /// The ledger says these bytes are our own output.
    AlreadyCompressed,
    /// Reused a previous compression of identical content.
    Cached { archived: bool },
    /// Freshly compressed by the remote service.
    Compressed {
        input_size: u64,
        output_size: u64,
        ratio: f64,
        archived: bool,
    },
    /// The remote service didn't compress it; the original is returned.
    Degraded { reason: String },
}

/// The content the build should use for a file, and how it was arrived at.
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub content: Vec<u8>,
    pub outcome: Outcome,
}

/// Per-build processor. Build once and share it between every file.
pub struct Processor {
    options: Options,
    ledger: Ledger,
    cache: CacheHandle,
    compressor: CompressorHandle,
}

impl Processor {
    pub fn new(options: Options, cache: CacheHandle, compressor: CompressorHandle) -> Self {
        let ledger = Ledger::at_root(&options.root);
        Self { options, ledger, cache, compressor }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Decide what the build should use in place of `file`.
    ///
    /// In order, the first that applies wins:
    ///
    /// 1. **Ignored** paths come back untouched, without being read.
    /// 2. **Already compressed**: the ledger has these exact bytes as a
    ///    previous output, so they're returned as they are.
    /// 3. **Cache hit**: a previous compression of the same content and
    ///    basename is reused (and replaces the original when configured).
    /// 4. **Remote**: the service compresses it; the result replaces the
    ///    original when configured and is cached for next time. If the
    ///    service fails, the original comes back.
    ///
    /// Files that aren't JPEG or PNG are warned about but otherwise go
    /// through the same steps.
    ///
    /// # Errors
    /// Only ledger problems and failures while archiving or replacing the
    /// original are errors. Cache and remote problems are logged and the
    /// file degrades instead.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub async fn process(&self, file: SourceFile) -> Result<Processed> {
        if self.options.ignore.matches(&file.path) {
            return Ok(Processed { content: file.content, outcome: Outcome::Ignored });
        }
        if !file.is_supported() {
            tracing::warn!(path = %file.path.display(), "Skipped");
            tracing::debug!(extension = ?file.extname(), "Only jpg, jpeg and png images can be compressed");
        }

        self.ledger.ensure_initialized(self.options.replace_raw).await.or_raise(|| ErrorKind::Ledger)?;
        let config = ProcessConfig::derive(&self.options, &file);

        if self.ledger.has_record_for_digest(&config.original_digest.to_hex()).await {
            tracing::info!(path = %file.path.display(), "Already compressed");
            return Ok(Processed { content: file.content, outcome: Outcome::AlreadyCompressed });
        }

        match self.cache.read_cache_file(&config.cache_key).await {
            Ok(Some(cached)) => {
                tracing::info!(path = %file.path.display(), cache_dir = %self.cache.cache_dir().display(), "Compressed by cache");
                let archived = config.replace_raw;
                if archived {
                    replace_and_archive(&self.ledger, &config, &file, &cached).await?;
                }
                return Ok(Processed { content: cached, outcome: Outcome::Cached { archived } });
            },
            Ok(None) => {},
            Err(e) => tracing::warn!(cache = %self.cache.name(), key = %config.cache_key, error = ?e, "Cache read failed"),
        }

        let compressed = match self.compressor.compress(&file.content).await {
            RemoteOutcome::Success(compressed) => compressed,
            RemoteOutcome::Failure { reason } => {
                tracing::warn!(path = %file.path.display(), "Skipped");
                tracing::error!(service = %self.compressor.name(), %reason, "Compression failed");
                return Ok(Processed { content: file.content, outcome: Outcome::Degraded { reason } });
            },
        };
        tracing::info!(
            path = %file.path.display(),
            input = compressed.input_size,
            output = compressed.output_size,
            saved = %format!("{:.2}%", compressed.saved_percent()),
            "Compressed"
        );

        let archived = config.replace_raw;
        if archived {
            replace_and_archive(&self.ledger, &config, &file, &compressed.data).await?;
        }
        if let Err(e) = self.cache.cache_file(&compressed.data, &config.cache_key).await {
            tracing::warn!(cache = %self.cache.name(), key = %config.cache_key, error = ?e, "Cache write failed");
        }

        Ok(Processed {
            outcome: Outcome::Compressed {
                input_size: compressed.input_size,
                output_size: compressed.output_size,
                ratio: compressed.ratio,
                archived,
            },
            content: compressed.data,
        })
    }
}
