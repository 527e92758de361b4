//! Schema Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A schema error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configured folder doesn't exist or isn't a directory.
    #[display("schema folder missing: {}", _0.display())]
    SchemaFolderMissing(#[error(not(source))] PathBuf),
    /// Reading the folder or one of its files failed.
    #[display("could not read schema path: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A JSON schema definition could not be parsed.
    #[display("invalid schema definition: {_0}")]
    InvalidSchema(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
