//! Local filesystem storage backend.
//!
//! This module provides a storage backend implementation for the local filesystem.
//! Objects are stored in a configured directory and accessed using standard filesystem
//! operations via `tokio::fs` for async I/O.

use crate::backend::EntryStream;
use crate::entry::StorageEntry;
use crate::error::{ErrorKind, Result};
use crate::key::{validate as validate_key, validate_prefix};
use crate::StorageBackend;
use async_stream::stream;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(StorageEntry),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores objects as files in a directory on the local filesystem. Keys map
/// onto paths relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use dataname_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/datasets")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the store
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
            }
        } else {
            // Use non-async here; it'll only happen once on initialization
            // and it's not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }

        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for an object key.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_key(key)?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to an object key.
    fn relative_key(&self, absolute: &Path) -> Result<String> {
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", absolute.display(), self.root.display()))
        })?;
        let segments = relative
            .components()
            .map(|component| match component {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_raise(|| ErrorKind::InvalidKey(relative.display().to_string()))?;
        validate_key(&segments.join("/"))
    }

    fn entry(key: String, metadata: &Metadata) -> StorageEntry {
        let modified = metadata.modified().ok().map(Into::into);
        StorageEntry::new(key, metadata.len(), modified)
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Classifies one directory entry during a listing walk. Keeping this out
    /// of the stream body means errors can be propagated with `?`.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&str>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path.display().to_string()))?;
        let key = self.relative_key(&path)?;
        if metadata.is_dir() {
            // Only descend where keys under the directory can still match.
            let dir = format!("{key}/");
            return Ok(match prefix {
                Some(pfx) if !dir.starts_with(pfx) && !pfx.starts_with(&dir) => WalkEntry::Skip,
                _ => WalkEntry::Descend(path),
            });
        }
        if let Some(pfx) = prefix
            && !key.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Self::entry(key, &metadata)));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryStream<'a> {
        let validated_prefix = match prefix.map(validate_prefix).transpose() {
            Ok(pfx) => pfx.flatten(),
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        // Walk from the directory part of the prefix: "imports/2024-05" starts
        // in "imports" and matches anything in it whose key starts with the
        // prefix.
        let start_dir = match validated_prefix.as_deref().and_then(|pfx| pfx.rsplit_once('/')) {
            Some((dir, _)) => self.root.join(dir),
            None => self.root.clone(),
        };
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // To stay consistent with the behaviour of S3-compatible
                    // backends, listing under a directory that doesn't exist
                    // results in an empty list not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current.display().to_string())));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err(exn::Exn::from(Self::map_io_error(e, &current.display().to_string())));
                            continue 'entries;
                        },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)? && abs_path.is_file())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        // Create parent directories if needed, to keep behaviour
        // consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, key))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn stat(&self, key: &str) -> Result<StorageEntry> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Ok(Self::entry(validate_key(key)?, &metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    fn ids(entries: &[StorageEntry]) -> Vec<&str> {
        entries.iter().filter_map(StorageEntry::id).collect()
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_absolute_path() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("imports/2024-05-01-sales.csv");
        assert_eq!(backend.absolute_path("imports/2024-05-01-sales.csv").unwrap(), expected);
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[test]
    fn test_relative_key() {
        let (temp_dir, backend) = backend();
        let abs = temp_dir.path().join("imports").join("2024-05-01-sales.csv");
        assert_eq!(backend.relative_key(&abs).unwrap(), "imports/2024-05-01-sales.csv");
        assert!(backend.relative_key(Path::new("/other/file.csv")).is_err());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (_temp_dir, backend) = backend();
        backend.write("test.csv", b"a,b\n1,2\n").await.unwrap();
        assert_eq!(backend.read("test.csv").await.unwrap(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_write_creates_directories() {
        let (_temp_dir, backend) = backend();
        backend.write("a/b/c/file.csv", b"data").await.unwrap();
        assert!(backend.exists("a/b/c/file.csv").await.unwrap());
        // Directories aren't objects.
        assert!(!backend.exists("a/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_temp_dir, backend) = backend();
        backend.write("file.csv", b"data").await.unwrap();
        backend.delete("file.csv").await.unwrap();
        assert!(!backend.exists("file.csv").await.unwrap());
        let err = backend.delete("file.csv").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_temp_dir, backend) = backend();
        backend.write("imports/file.csv", b"12345").await.unwrap();
        let entry = backend.stat("imports//file.csv").await.unwrap();
        assert_eq!(entry.id(), Some("imports/file.csv"));
        assert_eq!(entry.size, 5);
        assert!(entry.modified.is_some());
        let err = backend.stat("imports").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let (_temp_dir, backend) = backend();
        for key in ["b/2024-01-02-x.csv", "a.csv", "b/2024-01-01-x.csv", "b-c.csv"] {
            backend.write(key, b"data").await.unwrap();
        }
        let entries = backend.list(None).await.unwrap();
        assert_eq!(ids(&entries), ["a.csv", "b-c.csv", "b/2024-01-01-x.csv", "b/2024-01-02-x.csv"]);
    }

    #[tokio::test]
    async fn test_list_string_prefix() {
        let (_temp_dir, backend) = backend();
        for key in [
            "imports/2024-05-01-sales.csv",
            "imports/2024-05-01-sales_2.csv",
            "imports/2024-05-01-stock.csv",
            "imports/2024-05-01-sales/nested.csv",
            "imports-old/2024-05-01-sales.csv",
        ] {
            backend.write(key, b"data").await.unwrap();
        }
        let entries = backend.list(Some("imports/2024-05-01-sales")).await.unwrap();
        assert_eq!(
            ids(&entries),
            [
                "imports/2024-05-01-sales.csv",
                "imports/2024-05-01-sales/nested.csv",
                "imports/2024-05-01-sales_2.csv"
            ]
        );
        let entries = backend.list(Some("imports/")).await.unwrap();
        assert_eq!(entries.len(), 4);
        let entries = backend.list(Some("imports")).await.unwrap();
        assert_eq!(entries.len(), 5);
    }

    #[tokio::test]
    async fn test_list_nonexistent_prefix() {
        let (_temp_dir, backend) = backend();
        assert!(backend.list(Some("nonexistent/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_is_single_page() {
        let (_temp_dir, backend) = backend();
        backend.write("a.csv", b"data").await.unwrap();
        backend.write("b.csv", b"data").await.unwrap();
        let listing = backend.list_pages(None).await.unwrap();
        assert_eq!(listing.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_key_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.read("../etc/passwd").await.is_err());
        assert!(backend.read("etc/../../passwd").await.is_err());
        assert!(backend.write("../etc/passwd", b"data").await.is_err());
        assert!(backend.delete("../../file").await.is_err());
        assert!(backend.list(Some("../")).await.is_err());
    }
}
