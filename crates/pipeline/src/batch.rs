use crate::error::Result;
use crate::file::SourceFile;
use crate::process::{Outcome, Processed, Processor};
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Process every file of `files`, up to `concurrency` at once.
///
/// Results are yielded as they complete, not in input order. One file
/// failing doesn't stop the others.
pub fn process_all<'a>(
    processor: &'a Processor,
    files: impl Stream<Item = SourceFile> + 'a,
    concurrency: usize,
) -> impl Stream<Item = (PathBuf, Result<Processed>)> + 'a {
    files
        .map(move |file| async move {
            let path = file.path.clone();
            (path, processor.process(file).await)
        })
        .buffer_unordered(concurrency.max(1))
}

/// Like [`process_all`], reading each file (relative to the processor's
/// root) as part of its own slot of concurrency.
pub fn process_paths<'a>(
    processor: &'a Processor,
    paths: impl Stream<Item = PathBuf> + 'a,
    concurrency: usize,
) -> impl Stream<Item = (PathBuf, Result<Processed>)> + 'a {
    paths
        .map(move |path| async move {
            let result = match SourceFile::load(&processor.options().root, path.clone()).await {
                Ok(file) => processor.process(file).await,
                Err(e) => Err(e),
            };
            (path, result)
        })
        .buffer_unordered(concurrency.max(1))
}

/// Tally of a batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    pub ignored: usize,
    pub already_compressed: usize,
    pub cached: usize,
    pub compressed: usize,
    pub degraded: usize,
    pub failed: usize,
    /// Originals moved to the archive and replaced in place.
    pub archived: usize,
    /// Service-reported input bytes of freshly compressed files.
    pub bytes_in: u64,
    /// Service-reported output bytes of freshly compressed files.
    pub bytes_out: u64,
}

impl Summary {
    pub fn record(&mut self, result: &Result<Processed>) {
        let Ok(processed) = result else {
            self.failed += 1;
            return;
        };
        match &processed.outcome {
            Outcome::Ignored => self.ignored += 1,
            Outcome::AlreadyCompressed => self.already_compressed += 1,
            Outcome::Cached { archived } => {
                self.cached += 1;
                self.archived += usize::from(*archived);
            },
            Outcome::Compressed { input_size, output_size, archived, .. } => {
                self.compressed += 1;
                self.archived += usize::from(*archived);
                self.bytes_in += input_size;
                self.bytes_out += output_size;
            },
            Outcome::Degraded { .. } => self.degraded += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ignored + self.already_compressed + self.cached + self.compressed + self.degraded + self.failed
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} files: {} compressed, {} cached, {} already compressed, {} ignored, {} not compressed, {} failed",
            self.total(),
            self.compressed,
            self.cached,
            self.already_compressed,
            self.ignored,
            self.degraded,
            self.failed,
        )?;
        if self.bytes_in > 0 {
            write!(f, " ({} -> {} bytes)", self.bytes_in, self.bytes_out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::sync::Arc;
    use std::time::Duration;
    use tinyimg_remote::MockCompressor;
    use tinyimg_storage::backend::MockCache;

    fn write(root: &std::path::Path, path: &str, content: &[u8]) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_paths_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..8 {
            write(dir.path(), &format!("img/{i}.png"), format!("image {i}").as_bytes());
        }
        write(dir.path(), "node_modules/pkg/logo.png", b"vendored");
        let compressor =
            Arc::new(MockCompressor::returning(b"small".to_vec()).with_delay(Duration::from_millis(20)));
        let processor =
            Processor::new(Options::new(dir.path()).with_replace_raw(true), Arc::new(MockCache::default()), compressor.clone());

        let mut paths: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("img/{i}.png"))).collect();
        paths.push(PathBuf::from("node_modules/pkg/logo.png"));
        paths.push(PathBuf::from("img/missing.png"));
        let results: Vec<_> = process_paths(&processor, futures::stream::iter(paths), 4).collect().await;

        let mut summary = Summary::default();
        results.iter().for_each(|(_, result)| summary.record(result));
        assert_eq!(summary.total(), 10);
        assert_eq!(summary.compressed, 8);
        assert_eq!(summary.archived, 8);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(compressor.calls(), 8);
        // Every file produced the same bytes: a single ledger record.
        assert_eq!(processor.ledger().records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_process_all() {
        let dir = tempfile::tempdir().unwrap();
        let processor = Processor::new(
            Options::new(dir.path()),
            Arc::new(MockCache::default()),
            Arc::new(MockCompressor::failing("compress img error")),
        );
        let files = vec![
            SourceFile::new("a.png", dir.path().join("a.png"), b"a".to_vec()),
            SourceFile::new("b.jpg", dir.path().join("b.jpg"), b"b".to_vec()),
        ];
        let mut results: Vec<_> = process_all(&processor, futures::stream::iter(files), 2).collect().await;
        results.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(results[0].0, PathBuf::from("a.png"));
        assert_eq!(results[0].1.as_ref().unwrap().content, b"a");
        assert_eq!(results[1].1.as_ref().unwrap().content, b"b");
    }

    #[test]
    fn test_summary_display() {
        let mut summary = Summary::default();
        let compressed = Processed {
            content: vec![],
            outcome: Outcome::Compressed { input_size: 1000, output_size: 400, ratio: 0.4, archived: false },
        };
        summary.record(&Ok(compressed));
        summary.record(&Ok(Processed { content: vec![], outcome: Outcome::Cached { archived: false } }));
        assert_eq!(
            summary.to_string(),
            "2 files: 1 compressed, 1 cached, 0 already compressed, 0 ignored, 0 not compressed, 0 failed (1000 -> 400 bytes)"
        );
    }
}
