use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("project root is not usable: {}", _0.display())]
    Root(#[error(not(source))] PathBuf),
    #[display("invalid configuration")]
    Config,
    #[display("cache could not be opened")]
    Cache,
    #[display("compression client could not be built")]
    Remote,
    #[display("ledger could not be read")]
    Ledger,
    #[display("could not search for images in {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    #[display("{_0} file(s) could not be processed")]
    Failed(#[error(not(source))] usize),
}
