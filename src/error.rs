use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open storage")]
    Storage,
    #[display("could not load schemas")]
    Schema,
    #[display("catalog operation failed")]
    Catalog,
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("could not write output")]
    Output,
}
