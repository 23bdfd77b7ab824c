use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const COMPRESSED: &str = "|compressed:";
const ORIGINAL: &str = "|original:";
const PATH: &str = "|path:";

/// One line of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Digest of the compressed bytes written back in place.
    pub compressed: String,
    /// Digest of the bytes that were there before.
    pub original: String,
    /// Path of the image relative to the project root.
    pub path: String,
}

impl LedgerRecord {
    pub fn new(compressed: impl Into<String>, original: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            compressed: compressed.into(),
            original: original.into(),
            path: path.into(),
        }
    }

    /// The token that identifies a record for `digest` inside ledger text.
    pub(crate) fn marker(digest: &str) -> String {
        format!("{COMPRESSED}{digest}|")
    }
}

impl Display for LedgerRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{COMPRESSED}{}{ORIGINAL}{}{PATH}{}|", self.compressed, self.original, self.path)
    }
}

impl FromStr for LedgerRecord {
    type Err = Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || ErrorKind::InvalidRecord(line.to_string());
        // The path is last and may itself contain `|`, so peel fields off the
        // front and take everything up to the final delimiter as the path.
        let Some(rest) = line.trim_end().strip_prefix(COMPRESSED) else {
            exn::bail!(invalid());
        };
        let Some((compressed, rest)) = rest.split_once(ORIGINAL) else {
            exn::bail!(invalid());
        };
        let Some((original, rest)) = rest.split_once(PATH) else {
            exn::bail!(invalid());
        };
        let Some(path) = rest.strip_suffix('|') else {
            exn::bail!(invalid());
        };
        if compressed.is_empty() || original.is_empty() {
            exn::bail!(invalid());
        }
        Ok(Self::new(compressed, original, path))
    }
}
