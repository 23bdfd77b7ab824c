use std::fmt::{Display, Formatter, LowerHex, Result as FmtResult};

/// Content fingerprint of a file: MD5, rendered as 32 lowercase hex
/// characters. Ledger files and cache keys written by earlier releases hold
/// the same rendering, so it must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 16]);

impl Digest {
    pub fn to_hex(&self) -> String {
        format!("{self:x}")
    }
}

impl LowerHex for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        LowerHex::fmt(self, f)
    }
}

/// Fingerprint `bytes`.
pub fn digest(bytes: &[u8]) -> Digest {
    Digest(md5::compute(bytes).0)
}
