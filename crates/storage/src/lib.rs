//! Content-addressed cache storage for compressed images.
//!
//! A cache entry is the compressed output of one image, stored under a flat
//! key of the form `<digest>-<basename>`. This crate doesn't know how keys
//! are derived; it only guarantees that a key maps to exactly one entry
//! inside the cache directory and that it can never escape it.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::CacheBackend;
pub use crate::path::validate_key;
use std::sync::Arc;

pub type CacheHandle = Arc<dyn CacheBackend + Send + Sync>;
