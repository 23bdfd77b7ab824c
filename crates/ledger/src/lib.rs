//! Compressed-file ledger.
//!
//! A plain text file at the project root (`.tinyimgcache`) with one line per
//! image this tool has ever written back in place:
//!
//! ```text
//! |compressed:<digest>|original:<digest>|path:<relative path>|
//! ```
//!
//! The ledger answers a single question, "has this digest been produced as
//! compressed output before?", so that a build doesn't feed an image it
//! already compressed back into the compressor. It survives independently
//! of the content cache: clearing one doesn't invalidate the other.
//!
//! # Architecture
//! - The file is read once per build into an in-memory buffer and never
//!   re-read; lookups are substring searches over that buffer.
//! - Appends go to the file first and the buffer second, one at a time, so
//!   lookups from other files in the same build see every record as soon as
//!   it's durable.
//! - Nothing is ever rewritten or removed.
//!
//! There is no locking across processes. Two builds sharing a project root
//! may both append a record for the same digest; lookups don't care.

pub mod error;
mod ledger;
mod record;

pub use crate::ledger::{Appended, LEDGER_FILE_NAME, Ledger};
pub use crate::record::LedgerRecord;
