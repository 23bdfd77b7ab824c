use crate::digest::{Digest, digest};
use crate::file::SourceFile;
use crate::ignore::Ignore;
use std::path::{Component, Path, PathBuf};

/// Archive directory used when none is configured, relative to the root.
pub const DEFAULT_RELEASE_SOURCE_PATH: &str = "doc/img";

/// Settings that hold for every file of a build.
#[derive(Debug, Clone)]
pub struct Options {
    /// Absolute project root. The ledger lives here.
    pub root: PathBuf,
    pub replace_raw: bool,
    pub release_source_path: PathBuf,
    pub ignore: Ignore,
}

impl Options {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            replace_raw: false,
            release_source_path: PathBuf::from(DEFAULT_RELEASE_SOURCE_PATH),
            ignore: Ignore::default(),
        }
    }

    pub fn with_replace_raw(mut self, replace_raw: bool) -> Self {
        self.replace_raw = replace_raw;
        self
    }

    pub fn with_release_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.release_source_path = path.into();
        self
    }

    pub fn with_ignore(mut self, ignore: Ignore) -> Self {
        self.ignore = ignore;
        self
    }

    /// Root of the archive of originals. Absolute paths are used as they are.
    pub fn release_source_base_dir(&self) -> PathBuf {
        self.root.join(&self.release_source_path)
    }
}

/// Everything the pipeline needs to know about one file, derived afresh
/// for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub replace_raw: bool,
    pub release_source_base_dir: PathBuf,
    /// Directory the original is archived into.
    pub release_source_dir: PathBuf,
    /// Where the original is archived.
    pub release_source_path: PathBuf,
    pub original_digest: Digest,
    pub cache_key: String,
}

impl ProcessConfig {
    pub fn derive(options: &Options, file: &SourceFile) -> Self {
        let base = options.release_source_base_dir();
        let release_source_path = archived_under(&base, &file.path);
        let original_digest = digest(&file.content);
        Self {
            replace_raw: options.replace_raw,
            release_source_dir: release_source_path.parent().unwrap_or(&base).to_path_buf(),
            release_source_path,
            release_source_base_dir: base,
            cache_key: cache_key(&original_digest, &file.basename()),
            original_digest,
        }
    }
}

/// `path` nested under `base`. Roots, `.` and `..` are dropped, so the result
/// never leaves `base`.
fn archived_under(base: &Path, path: &Path) -> PathBuf {
    let mut archived = base.to_path_buf();
    archived.extend(path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part),
        _ => None,
    }));
    archived
}

/// Cache key for content with `digest` stored under `basename`.
pub fn cache_key(digest: &Digest, basename: &str) -> String {
    format!("{digest}-{basename}")
}
