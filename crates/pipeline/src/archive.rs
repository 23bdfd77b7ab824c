use crate::digest::digest;
use crate::error::{ErrorKind, Result};
use crate::file::SourceFile;
use crate::options::ProcessConfig;
use exn::ResultExt;
use tinyimg_ledger::{Appended, Ledger, LedgerRecord};
use tokio::fs;

/// Move the original out of the way and put `compressed` in its place.
///
/// The steps run in order and stop at the first failure. Nothing is rolled
/// back: if the original was archived but the replacement failed, the
/// archive copy stays where it is.
pub(crate) async fn replace_and_archive(
    ledger: &Ledger,
    config: &ProcessConfig,
    file: &SourceFile,
    compressed: &[u8],
) -> Result<()> {
    fs::create_dir_all(&config.release_source_dir)
        .await
        .or_raise(|| ErrorKind::Archive(config.release_source_dir.clone()))?;
    fs::write(&config.release_source_path, &file.content)
        .await
        .or_raise(|| ErrorKind::Archive(config.release_source_path.clone()))?;
    tracing::info!(
        path = %file.path.display(),
        archive = %config.release_source_path.display(),
        "Original archived"
    );

    fs::write(&file.full_path, compressed).await.or_raise(|| ErrorKind::Archive(file.full_path.clone()))?;
    tracing::info!(path = %file.path.display(), bytes = compressed.len(), "Replaced with compressed image");

    let record = LedgerRecord::new(
        digest(compressed).to_hex(),
        config.original_digest.to_hex(),
        file.path.to_string_lossy(),
    );
    match ledger.append(&record).await.or_raise(|| ErrorKind::Ledger)? {
        Appended::Recorded => tracing::info!(path = %file.path.display(), "Recorded in ledger"),
        Appended::AlreadyPresent => tracing::info!(path = %file.path.display(), "Already recorded in ledger"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use std::path::Path;

    fn setup(root: &Path) -> (SourceFile, ProcessConfig) {
        std::fs::create_dir_all(root.join("src/img")).unwrap();
        std::fs::write(root.join("src/img/logo.png"), b"original").unwrap();
        let file = SourceFile::new("src/img/logo.png", root.join("src/img/logo.png"), b"original".to_vec());
        let options = Options::new(root).with_replace_raw(true);
        let config = ProcessConfig::derive(&options, &file);
        (file, config)
    }

    #[tokio::test]
    async fn test_archives_replaces_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let (file, config) = setup(dir.path());
        let ledger = Ledger::at_root(dir.path());

        replace_and_archive(&ledger, &config, &file, b"small").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("doc/img/src/img/logo.png")).unwrap(), b"original");
        assert_eq!(std::fs::read(&file.full_path).unwrap(), b"small");
        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], LedgerRecord::new(digest(b"small").to_hex(), digest(b"original").to_hex(), "src/img/logo.png"));
    }

    #[tokio::test]
    async fn test_second_run_appends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (file, config) = setup(dir.path());
        let ledger = Ledger::at_root(dir.path());
        replace_and_archive(&ledger, &config, &file, b"small").await.unwrap();
        replace_and_archive(&ledger, &config, &file, b"small").await.unwrap();
        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_archive_failure_stops_before_replacing() {
        let dir = tempfile::tempdir().unwrap();
        let (file, config) = setup(dir.path());
        // A file where the archive directory needs to go.
        std::fs::write(dir.path().join("doc"), b"in the way").unwrap();
        let ledger = Ledger::at_root(dir.path());

        let err = replace_and_archive(&ledger, &config, &file, b"small").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Archive(_)));
        assert_eq!(std::fs::read(&file.full_path).unwrap(), b"original");
        assert!(!ledger.path().exists());
    }
}
