//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a catalog failure.
///
/// The naming core itself can't fail. Listing and deletion errors carry the
/// storage error below them in the error tree.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing the store failed.
    #[display("could not list objects")]
    Listing,
    /// Deleting an object failed.
    #[display("could not delete object: {_0}")]
    Delete(#[error(not(source))] String),
    /// The resolved name is already taken, so writing it would overwrite an
    /// existing object.
    #[display("resolved name already exists: {_0}")]
    NameTaken(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A failed delete is usually a permissions or a not-found problem.
        matches!(self, Self::Listing)
    }
}
