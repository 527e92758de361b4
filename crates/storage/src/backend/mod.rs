//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for object operations across different backends (local
//! filesystem, S3-compatible services, etc.).

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::entry::{Listing, StorageEntry};
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub(crate) type EntryStream<'a> = Pin<Box<dyn Stream<Item = Result<StorageEntry>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous to efficiently handle network
/// operations and concurrent access. The trait supports both local filesystem
/// and remote storage backends.
///
/// # Keys
/// All keys are `/`-separated and relative to the storage root. They are
/// validated with [`validate_key`](crate::validate_key) before use, and
/// listing prefixes with [`validate_prefix`](crate::validate_prefix).
///
/// # Examples
///
/// ```
/// use dataname_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_hardcoded_file(backend: &dyn StorageBackend) -> Result<u64> {
///     let key = "imports/2024-05-01-sales.csv";
///     if backend.exists(key).await? {
///         let data = backend.read(key).await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// List all objects whose key starts with an optional prefix, sorted by
    /// key.
    ///
    /// Prefixes match as plain strings, as they do on S3: the prefix
    /// `imports/2024-05-01-sales` matches both `imports/2024-05-01-sales.csv`
    /// and `imports/2024-05-01-sales_2.csv`.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] and sort
    /// them before returning.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StorageEntry>> {
        let mut entries: Vec<StorageEntry> = self.list_stream(prefix).try_collect().await?;
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    /// List objects as the store paginates them.
    ///
    /// The default implementation returns a single page holding the result
    /// of [`list()`](Self::list). Backends with real pagination return one
    /// nested page per response.
    async fn list_pages(&self, prefix: Option<&str>) -> Result<Listing> {
        Ok(Listing::from(self.list(prefix).await?))
    }

    /// Stream object metadata matching an optional prefix.
    ///
    /// Yields results incrementally, in whatever order the backend produces
    /// them.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use dataname_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    ///
    /// let mut stream = backend.list_stream(Some("imports/"));
    /// while let Some(entry) = stream.try_next().await? {
    ///     println!("{:?}: {} bytes", entry.id, entry.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryStream<'a>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read object contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Write object contents.
    ///
    /// Creates a new object or overwrites an existing one. Backends with a
    /// directory structure create parent directories as needed.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete an object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get object metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn stat(&self, key: &str) -> Result<StorageEntry>;
}
