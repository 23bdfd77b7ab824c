use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// Extensions the remote service is known to accept.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// An image handed to the processor by the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Where the file lives on disk; replaced in place when configured.
    pub full_path: PathBuf,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, full_path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            full_path: full_path.into(),
            content: content.into(),
        }
    }

    /// Read `path` (relative to `root`) from disk.
    pub async fn load(root: &Path, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let full_path = root.join(&path);
        let content = tokio::fs::read(&full_path).await.or_raise(|| ErrorKind::Read(full_path.clone()))?;
        Ok(Self { path, full_path, content })
    }

    /// Lowercased extension, without the dot.
    pub fn extname(&self) -> Option<String> {
        self.path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
    }

    /// Final path component, as used in cache keys.
    pub fn basename(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }

    pub fn is_supported(&self) -> bool {
        self.extname().is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }
}
