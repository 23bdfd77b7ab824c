//! Image discovery for the `run` command.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::path::{Component, Path, PathBuf};
use tinyimg_config::Config;
use tinyimg_ledger::LEDGER_FILE_NAME;
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// What to look for beneath the project root.
pub struct Discovery<'a> {
    root: &'a Path,
    config: &'a Config,
    /// Absolute directories never descended into (the archive of originals,
    /// a cache kept inside the project).
    excluded: Vec<PathBuf>,
}

impl<'a> Discovery<'a> {
    pub fn new(root: &'a Path, config: &'a Config, excluded: Vec<PathBuf>) -> Self {
        Self { root, config, excluded }
    }

    /// Relative paths of every image beneath `starts` (or the whole root).
    ///
    /// Directories are filtered by the exclusions and the configured ignore
    /// names, files by the configured extensions. A start that names a file
    /// is yielded as long as it exists, whatever its extension.
    pub fn images<'s>(&'s self, starts: &'s [PathBuf]) -> impl Stream<Item = Result<PathBuf>> + 's {
        stream! {
            let mut stack = Vec::new();
            if starts.is_empty() {
                stack.push(self.root.to_path_buf());
            }
            for start in starts {
                match self.resolve_start(start).await {
                    Ok(WalkEntry::File(relative)) => yield Ok(relative),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }

            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        yield Err::<PathBuf, _>(e).or_raise(|| ErrorKind::Walk(current.clone()));
                        continue 'dirs;
                    },
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err::<PathBuf, _>(e).or_raise(|| ErrorKind::Walk(current.clone()));
                            continue 'dirs;
                        },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(relative)) => yield Ok(relative),
                        Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    }
                }
            }
        }
    }

    async fn resolve_start(&self, start: &Path) -> Result<WalkEntry> {
        let relative = if start.is_absolute() {
            start.strip_prefix(self.root).or_raise(|| ErrorKind::Walk(start.to_path_buf()))?
        } else {
            start
        };
        if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            exn::bail!(ErrorKind::Walk(start.to_path_buf()));
        }
        let absolute = self.root.join(relative);
        let metadata = fs::metadata(&absolute).await.or_raise(|| ErrorKind::Walk(start.to_path_buf()))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(absolute));
        }
        Ok(WalkEntry::File(relative.components().collect()))
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.or_raise(|| ErrorKind::Walk(path.clone()))?;
        if metadata.is_dir() {
            let ignored = entry.file_name().to_str().is_some_and(|name| self.config.ignore.iter().any(|i| i == name));
            if ignored || self.excluded.iter().any(|excluded| path.starts_with(excluded)) {
                return Ok(WalkEntry::Skip);
            }
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() && entry.file_name() != LEDGER_FILE_NAME && self.config.accepts_extension(&path) {
            let relative = path.strip_prefix(self.root).or_raise(|| ErrorKind::Walk(path.clone()))?;
            return Ok(WalkEntry::File(relative.to_path_buf()));
        }
        // Other file types, and symlinks, which aren't followed.
        Ok(WalkEntry::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn touch(root: &Path, path: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, b"x").unwrap();
    }

    async fn collect(discovery: &Discovery<'_>, starts: &[PathBuf]) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = discovery.images(starts).map(|r| r.unwrap()).collect().await;
        found.sort();
        found
    }

    #[tokio::test]
    async fn test_walks_whole_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "logo.PNG");
        touch(dir.path(), "src/img/photo.jpg");
        touch(dir.path(), "src/img/anim.gif");
        touch(dir.path(), "node_modules/pkg/icon.png");
        touch(dir.path(), "doc/img/src/img/photo.jpg");
        touch(dir.path(), LEDGER_FILE_NAME);
        let config = Config::default();
        let discovery = Discovery::new(dir.path(), &config, vec![dir.path().join("doc/img")]);

        let found = collect(&discovery, &[]).await;

        assert_eq!(found, vec![PathBuf::from("logo.PNG"), PathBuf::from("src/img/photo.jpg")]);
    }

    #[tokio::test]
    async fn test_explicit_starts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/one.png");
        touch(dir.path(), "b/two.png");
        touch(dir.path(), "b/anim.gif");
        let config = Config::default();
        let discovery = Discovery::new(dir.path(), &config, vec![]);

        let found = collect(&discovery, &[PathBuf::from("a"), PathBuf::from("./b/anim.gif")]).await;

        assert_eq!(found, vec![PathBuf::from("a/one.png"), PathBuf::from("b/anim.gif")]);
    }

    #[tokio::test]
    async fn test_bad_starts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let discovery = Discovery::new(dir.path(), &config, vec![]);
        let starts = [PathBuf::from("../outside"), PathBuf::from("missing"), PathBuf::from("/elsewhere/img")];

        let results: Vec<_> = discovery.images(&starts).collect().await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r.as_ref().map_err(|e| &**e), Err(ErrorKind::Walk(_)))));
    }
}
