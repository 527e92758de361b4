//! In-memory storage backend for testing.

use super::EntryStream;
use crate::StorageBackend;
use crate::entry::StorageEntry;
use crate::error::{ErrorKind, Result};
use crate::key::{validate as validate_key, validate_prefix};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Objects are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation, and
/// listings come back in key order.
///
/// # Examples
///
/// ```
/// use dataname_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("imports/2024-05-01-sales.csv", b"a,b"),
/// ]);
/// assert!(backend.exists("imports/2024-05-01-sales.csv").await?);
///
/// backend.write("imports/2024-05-01-sales_1.csv", b"a,b").await?;
/// assert_eq!(backend.list(Some("imports/2024-05-01-sales")).await?.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<String, (OffsetDateTime, Vec<u8>)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = OffsetDateTime::now_utc();
        for (key, data) in files {
            let key = key.as_ref();
            let Ok(validated) = validate_key(key) else {
                panic!("MockBackend::with_files: invalid key {key}");
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
        }
    }

    /// Create a mock backend holding empty objects under each key.
    pub fn with_keys(keys: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self::with_files(keys.into_iter().map(|key| (key, Vec::new())))
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryStream<'a> {
        let validated_prefix = match prefix.map(validate_prefix).transpose() {
            Ok(pfx) => pfx.flatten(),
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<StorageEntry> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| match &validated_prefix {
                        Some(pfx) => key.starts_with(pfx.as_str()),
                        None => true,
                    })
                    .map(|(key, (inserted, data))| StorageEntry::new(key.clone(), data.len() as u64, Some(*inserted)))
                    .collect()
            };
            for entry in entries {
                yield Ok(entry);
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_inserted, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.insert(key, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.remove(&key).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }

    async fn stat(&self, key: &str) -> Result<StorageEntry> {
        let key = validate_key(key)?;
        let guard = self.storage.read().await;
        let (inserted, data) = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(StorageEntry::new(key.clone(), data.len() as u64, Some(*inserted)))
    }
}
