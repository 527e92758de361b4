//! Read-only storage backend.
//!
//! Wraps another backend and prevents mutating operations from executing,
//! while still indicating success on return. Used for dry runs.

use crate::entry::{Listing, StorageEntry};
use crate::{BackendHandle, StorageBackend, backend::EntryStream, error::Result};
use async_trait::async_trait;

/// Read-only storage backend.
///
/// Wraps another backend and silently drops writes and deletes, logging an
/// [`info event`](tracing::Event) for each one instead.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StorageEntry>> {
        self.inner.list(prefix).await
    }

    async fn list_pages(&self, prefix: Option<&str>) -> Result<Listing> {
        self.inner.list_pages(prefix).await
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        tracing::info!(key, bytes = data.len(), "Skipping write during read-only mode");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tracing::info!(key, "Skipping delete during read-only mode");
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<StorageEntry> {
        self.inner.stat(key).await
    }
}
