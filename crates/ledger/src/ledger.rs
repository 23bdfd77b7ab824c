use crate::error::{ErrorKind, Result};
use crate::record::LedgerRecord;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{OnceCell, RwLock};
use tracing::instrument;

/// File name of the ledger, relative to the project root.
pub const LEDGER_FILE_NAME: &str = ".tinyimgcache";

/// Whether [`Ledger::append`] wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// A new line was written.
    Recorded,
    /// A record for the compressed digest was already there; nothing written.
    AlreadyPresent,
}

/// The ledger of one build.
///
/// Construct once per build and share it (by reference or `Arc`) with every
/// file being processed. Construction does no I/O; the file is touched on
/// the first [`ensure_initialized`](Self::ensure_initialized).
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    initialized: OnceCell<()>,
    buffer: RwLock<String>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            initialized: OnceCell::new(),
            buffer: RwLock::new(String::new()),
        }
    }

    /// Ledger at its conventional location inside `root`.
    pub fn at_root(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger into memory, exactly once per build.
    ///
    /// If the file exists its contents become the in-memory buffer. If it
    /// doesn't, an empty file is created only when `create_if_missing` is set
    /// (a build that never replaces images in place has no reason to leave a
    /// ledger behind). Either way later calls are no-ops, including calls
    /// that ask for creation after a first call that didn't; appending
    /// creates the file regardless.
    ///
    /// Concurrent callers wait for the first one to finish. If loading fails,
    /// nothing is recorded as initialized and the next call tries again.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn ensure_initialized(&self, create_if_missing: bool) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                match fs::read(&self.path).await {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        tracing::debug!(bytes = text.len(), "Loaded ledger");
                        *self.buffer.write().await = text;
                    },
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        if create_if_missing {
                            OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(&self.path)
                                .await
                                .or_raise(|| ErrorKind::Load(self.path.clone()))?;
                            tracing::debug!("Created empty ledger");
                        }
                    },
                    Err(e) => return Err(e).or_raise(|| ErrorKind::Load(self.path.clone())),
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }

    /// Whether a record exists whose *compressed* digest is `digest`.
    ///
    /// This is a plain substring test over the ledger text; records are never
    /// parsed here.
    pub async fn has_record_for_digest(&self, digest: &str) -> bool {
        let marker = LedgerRecord::marker(digest);
        let buffer = self.buffer.read().await;
        memchr::memmem::find(buffer.as_bytes(), marker.as_bytes()).is_some()
    }

    /// Append `record` unless one for the same compressed digest exists.
    ///
    /// Appends are serialized: the existence check, the file write and the
    /// buffer update happen under one lock. The buffer only changes once the
    /// line is in the file, so a failed write leaves the in-memory view as it
    /// was for every other file of the build.
    #[instrument(skip(self), fields(path = %self.path.display(), compressed = %record.compressed))]
    pub async fn append(&self, record: &LedgerRecord) -> Result<Appended> {
        self.ensure_initialized(true).await?;
        let mut buffer = self.buffer.write().await;
        let marker = LedgerRecord::marker(&record.compressed);
        if memchr::memmem::find(buffer.as_bytes(), marker.as_bytes()).is_some() {
            return Ok(Appended::AlreadyPresent);
        }
        // Don't glue a record onto the end of a hand-edited last line.
        let separator = if buffer.is_empty() || buffer.ends_with('\n') { "" } else { "\n" };
        let line = format!("{separator}{record}\n");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .or_raise(|| ErrorKind::Append(self.path.clone()))?;
        file.write_all(line.as_bytes()).await.or_raise(|| ErrorKind::Append(self.path.clone()))?;
        file.flush().await.or_raise(|| ErrorKind::Append(self.path.clone()))?;
        buffer.push_str(&line);
        tracing::debug!("Ledger record appended");
        Ok(Appended::Recorded)
    }

    /// Every well-formed record in the in-memory view, in file order.
    ///
    /// Lines that aren't records are skipped. Lookups never go through this;
    /// it's for reporting.
    pub async fn records(&self) -> Vec<LedgerRecord> {
        let buffer = self.buffer.read().await;
        buffer.lines().filter(|line| !line.trim().is_empty()).filter_map(|line| line.parse().ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    fn ledger_in(dir: &tempfile::TempDir) -> Ledger {
        Ledger::at_root(dir.path())
    }

    #[tokio::test]
    async fn test_missing_file_not_created_without_replace() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_initialized(false).await.unwrap();
        assert!(!ledger.path().exists());
        assert!(!ledger.has_record_for_digest("abc").await);
    }

    #[tokio::test]
    async fn test_missing_file_created_with_replace() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_initialized(true).await.unwrap();
        assert!(ledger.path().exists());
        assert_eq!(std::fs::read(ledger.path()).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_initialization_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        // First call decides: no file, no creation.
        ledger.ensure_initialized(false).await.unwrap();
        ledger.ensure_initialized(true).await.unwrap();
        assert!(!ledger.path().exists());
        // The file appearing afterwards isn't picked up either.
        std::fs::write(ledger.path(), "|compressed:abc|original:def|path:a.png|\n").unwrap();
        ledger.ensure_initialized(false).await.unwrap();
        assert!(!ledger.has_record_for_digest("abc").await);
    }

    #[tokio::test]
    async fn test_existing_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LEDGER_FILE_NAME),
            "|compressed:c1|original:o1|path:img/a.png|\n|compressed:c2|original:o2|path:img/b.png|\n",
        )
        .unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_initialized(false).await.unwrap();
        assert!(ledger.has_record_for_digest("c1").await);
        assert!(ledger.has_record_for_digest("c2").await);
        // Original digests aren't compressed markers.
        assert!(!ledger.has_record_for_digest("o1").await);
        // Prefixes don't match.
        assert!(!ledger.has_record_for_digest("c").await);
        assert_eq!(ledger.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_gate_open() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the ledger file should be can't be read.
        std::fs::create_dir(dir.path().join(LEDGER_FILE_NAME)).unwrap();
        let ledger = ledger_in(&dir);
        let err = ledger.ensure_initialized(true).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
        assert!(ledger.records().await.is_empty());
        // Fix the problem; the next call retries.
        std::fs::remove_dir(dir.path().join(LEDGER_FILE_NAME)).unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE_NAME), "|compressed:c1|original:o1|path:a.png|\n").unwrap();
        ledger.ensure_initialized(true).await.unwrap();
        assert!(ledger.has_record_for_digest("c1").await);
    }

    #[tokio::test]
    async fn test_append_writes_file_and_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_initialized(true).await.unwrap();
        let record = LedgerRecord::new("c1", "o1", "img/a.png");
        assert_eq!(ledger.append(&record).await.unwrap(), Appended::Recorded);
        assert!(ledger.has_record_for_digest("c1").await);
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), "|compressed:c1|original:o1|path:img/a.png|\n");
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        ledger.ensure_initialized(true).await.unwrap();
        let first = LedgerRecord::new("c1", "o1", "img/a.png");
        let again = LedgerRecord::new("c1", "o2", "img/b.png");
        assert_eq!(ledger.append(&first).await.unwrap(), Appended::Recorded);
        assert_eq!(ledger.append(&again).await.unwrap(), Appended::AlreadyPresent);
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_append_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE_NAME), "|compressed:c1|original:o1|path:a.png|").unwrap();
        let ledger = ledger_in(&dir);
        ledger.append(&LedgerRecord::new("c2", "o2", "b.png")).await.unwrap();
        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text, "|compressed:c1|original:o1|path:a.png|\n|compressed:c2|original:o2|path:b.png|\n");
        assert_eq!(ledger.records().await.len(), 2);
    }

    #[tokio::test]
    async fn test_append_failure_keeps_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let missing_root = dir.path().join("does-not-exist");
        let ledger = Ledger::at_root(&missing_root);
        // Initialization without creation succeeds on a missing directory...
        ledger.ensure_initialized(false).await.unwrap();
        // ...but appending can't create the file.
        let err = ledger.append(&LedgerRecord::new("c1", "o1", "a.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Append(_)));
        assert!(!ledger.has_record_for_digest("c1").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(ledger_in(&dir));
        let tasks = (0..32).map(|i| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger.ensure_initialized(true).await.unwrap();
                // Every digest is appended twice, from two different tasks.
                let record = LedgerRecord::new(format!("c{}", i % 16), format!("o{i}"), format!("img/{i}.png"));
                ledger.append(&record).await.unwrap()
            })
        });
        let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(results.iter().filter(|a| **a == Appended::Recorded).count(), 16);
        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text.lines().count(), 16);
        assert!(text.lines().all(|line| line.parse::<LedgerRecord>().is_ok()));
    }
}
