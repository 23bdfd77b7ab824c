//! Configuration for tinyimg.
//!
//! Layered with `figment`, later layers winning:
//!
//! 1. built-in defaults,
//! 2. `tinyimg.toml`, `tinyimg.yaml` and `tinyimg.json` in the project root
//!    (each optional),
//! 3. a file named on the command line (must exist),
//! 4. `TINYIMG_*` environment variables, nested keys separated by `__`
//!    (`TINYIMG_CACHE__READ_ONLY=true`).

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base name of the configuration files looked up in the project root.
pub const CONFIG_FILE_STEM: &str = "tinyimg";
/// Prefix of the environment variables that override configuration.
pub const ENV_PREFIX: &str = "TINYIMG_";
/// Cache directory used when nothing is configured and the platform has no
/// cache directory of its own, relative to the project root.
pub const FALLBACK_CACHE_DIR: &str = ".tinyimg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overwrite images in place with their compressed version, archiving the
    /// originals beneath `release_source_path`.
    pub replace_raw: bool,
    /// Archive directory for originals. Relative paths are relative to the
    /// project root.
    pub release_source_path: PathBuf,
    /// Directory names that exclude every path running through them.
    pub ignore: Vec<String>,
    /// Extensions of the files the CLI hands to the processor.
    pub extensions: Vec<String>,
    /// Files processed at the same time.
    pub concurrency: usize,
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            replace_raw: false,
            release_source_path: PathBuf::from("doc/img"),
            ignore: vec!["node_modules".to_string()],
            extensions: ["png", "jpg", "jpeg"].map(String::from).to_vec(),
            concurrency: 4,
            cache: CacheConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Read cached entries but never write new ones.
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: tinyimg_remote::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: tinyimg_remote::DEFAULT_TIMEOUT_SECS,
        }
    }
}
impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load and validate the configuration for the project at `root`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(root, explicit)?.extract().or_raise(|| ErrorKind::Extract)?;
        config.validate()?;
        tracing::debug!(root = %root.display(), ?config, "Configuration loaded");
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(root: &Path, explicit: Option<&Path>) -> Result<Figment> {
        let stem = root.join(CONFIG_FILE_STEM);
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(stem.with_extension("toml")))
            .merge(Yaml::file(stem.with_extension("yaml")))
            .merge(Json::file(stem.with_extension("json")));
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency"));
        }
        if self.remote.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("remote.timeout_secs"));
        }
        if !(self.remote.endpoint.starts_with("https://") || self.remote.endpoint.starts_with("http://")) {
            exn::bail!(ErrorKind::Invalid("remote.endpoint"));
        }
        if self.extensions.is_empty() || self.extensions.iter().any(|e| e.is_empty() || e.contains('.')) {
            exn::bail!(ErrorKind::Invalid("extensions"));
        }
        if self.ignore.iter().any(|name| name.is_empty() || name.contains(['/', '\\'])) {
            exn::bail!(ErrorKind::Invalid("ignore"));
        }
        Ok(())
    }

    /// Absolute cache directory for the project at `root`.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        match &self.cache.dir {
            Some(dir) => root.join(dir),
            None => directories::ProjectDirs::from("", "", "tinyimg")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .unwrap_or_else(|| root.join(FALLBACK_CACHE_DIR)),
        }
    }

    /// Whether `path` has an extension the CLI should process.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }
}
