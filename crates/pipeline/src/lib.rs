//! The per-image compression pipeline.
//!
//! For every image a build hands over, [`Processor::process`] decides between
//! leaving it alone, reusing an earlier compression from the content cache,
//! or sending it to the remote service, and optionally swaps the compressed
//! bytes in place of the original while archiving the original elsewhere.
//!
//! Two stores keep repeated builds cheap:
//! - the **ledger** ([`tinyimg_ledger`]) remembers which bytes are our own
//!   output, so an image replaced in place isn't compressed again;
//! - the **content cache** ([`tinyimg_storage`]) maps the digest and basename
//!   of an original to its compressed bytes.

mod archive;
mod batch;
mod digest;
pub mod error;
mod file;
mod ignore;
mod options;
mod process;

pub use crate::batch::{Summary, process_all, process_paths};
pub use crate::digest::{Digest, digest};
pub use crate::file::{SUPPORTED_EXTENSIONS, SourceFile};
pub use crate::ignore::Ignore;
pub use crate::options::{DEFAULT_RELEASE_SOURCE_PATH, Options, ProcessConfig, cache_key};
pub use crate::process::{Outcome, Processed, Processor};
