//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Object does not exist
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// The store could not be reached (connection, DNS, timeout, or a 5xx
    /// from the service)
    #[display("store unavailable: {_0}")]
    StoreUnavailable(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Key contains invalid characters or escapes the root
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::StoreUnavailable(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("a/b.csv".to_string()).to_string(), "object not found: a/b.csv");
        assert_eq!(ErrorKind::StoreUnavailable("timeout".to_string()).to_string(), "store unavailable: timeout");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::StoreUnavailable("timeout".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("a".to_string()).is_retryable());
        assert!(!ErrorKind::PermissionDenied("a".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidKey("..".to_string()).is_retryable());
    }
}
