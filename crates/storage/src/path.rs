//! Cache key validation.
//!
//! Keys end up as file names inside the cache directory, so they get the same
//! treatment a user-supplied path would: nothing that could climb out of the
//! directory, and nothing that the OS would silently truncate.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a cache key and returns it as a single-component relative path.
///
/// A key must resolve to exactly one normal path component. Trailing slashes
/// and `./` prefixes are tolerated, anything else that involves directories
/// is rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tinyimg_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("0123abcd-logo.png").is_ok());
/// assert_eq!(validate_key("./0123abcd-logo.png").unwrap(), Path::new("0123abcd-logo.png"));
/// // Invalid keys
/// assert!(validate_key("../0123abcd-logo.png").is_err());
/// assert!(validate_key("nested/0123abcd-logo.png").is_err());
/// assert!(validate_key("a\0b").is_err());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidKey(key.to_string());
    let mut components = Vec::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls; reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(s);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => exn::bail!(invalid()),
        }
    }
    match components.as_slice() {
        [single] => Ok(PathBuf::from(single)),
        _ => exn::bail!(invalid()),
    }
}
