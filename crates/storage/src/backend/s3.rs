//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, MinIO, and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file, as a
//! `key_id` and `key_secret` pair.

use crate::{
    StorageBackend,
    backend::EntryStream,
    entry::{Listing, StorageEntry},
    error::{ErrorKind, Result},
    key::{validate as validate_key, validate_prefix},
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, http::HttpResponse, retry::RetryConfig},
    error::SdkError,
    primitives::{ByteStream, DateTime},
    types::Object,
};
use exn::ResultExt;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
///
/// TODO: Adaptive rate limiting based on 429/throttling responses?
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use dataname_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "warehouse",
///     "my-bucket",
///     Some("datasets/".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(|p| validate_key(&p)).transpose()?;
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "dataname-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }

    fn entry(&self, object: &Object) -> Result<Option<StorageEntry>> {
        let Some(key) = object.key() else {
            return Ok(None);
        };
        let modified = object.last_modified().map(parse_datetime).transpose()?;
        let size = object.size().unwrap_or(0).max(0) as u64;
        Ok(Some(StorageEntry::new(relative_key(self.prefix.as_deref(), key)?, size, modified)))
    }

    /// Full S3 prefix for a listing, including the configured key prefix.
    fn list_prefix(&self, prefix: Option<&str>) -> Result<Option<String>> {
        let prefix = prefix.map(validate_prefix).transpose()?.flatten();
        Ok(match (&self.prefix, prefix) {
            (Some(root), Some(pfx)) => Some(format!("{root}/{pfx}")),
            (Some(root), None) => Some(format!("{root}/")),
            (None, pfx) => pfx,
        })
    }
}

/// Construct the full S3 key from a relative key.
fn full_key(prefix: Option<&str>, key: &str) -> Result<String> {
    let validated = validate_key(key)?;
    Ok(match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), validated),
        None => validated,
    })
}

/// Strip the configured prefix from an S3 key to get the relative key.
fn relative_key(prefix: Option<&str>, key: &str) -> Result<String> {
    let relative = match prefix {
        Some(prefix) => {
            let prefix_normalized = prefix.trim_end_matches('/');
            key.strip_prefix(prefix_normalized).and_then(|s| s.strip_prefix('/')).unwrap_or(key)
        },
        None => key,
    };
    validate_key(relative)
}

/// Convert AWS DateTime to OffsetDateTime.
fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
        .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
}

/// Sort an S3 SDK failure into an actionable category.
fn classify<E>(err: &SdkError<E, HttpResponse>, key: &str) -> ErrorKind {
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ErrorKind::StoreUnavailable(key.to_string()),
        SdkError::ServiceError(service) => classify_status(service.raw().status().as_u16(), key),
        SdkError::ResponseError(response) => classify_status(response.raw().status().as_u16(), key),
        _ => ErrorKind::BackendError(format!("{key}: {err}")),
    }
}

fn classify_status(status: u16, key: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::PermissionDenied(key.to_string()),
        404 => ErrorKind::NotFound(key.to_string()),
        500..=599 => ErrorKind::StoreUnavailable(format!("{key}: HTTP {status}")),
        _ => ErrorKind::BackendError(format!("{key}: HTTP {status}")),
    }
}

fn raise<T, E>(err: SdkError<E, HttpResponse>, key: &str) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let kind = classify(&err, key);
    Err(err).or_raise(|| kind)
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_pages(&self, prefix: Option<&str>) -> Result<Listing> {
        let list_prefix = self.list_prefix(prefix)?;
        let mut paginator = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(list_prefix.clone())
            .into_paginator()
            .send();
        let mut pages = Vec::new();
        loop {
            let _permit = self.acquire_permit().await?;
            let Some(page) = paginator.next().await else {
                break;
            };
            let page = match page {
                Ok(page) => page,
                Err(err) => return raise(err, list_prefix.as_deref().unwrap_or_default()),
            };
            let mut entries = Vec::new();
            for object in page.contents() {
                if let Some(entry) = self.entry(object)? {
                    entries.push(entry);
                }
            }
            tracing::trace!(backend = %self.name, entries = entries.len(), "Received S3 listing page");
            pages.push(Listing::from(entries));
        }
        Ok(Listing::Page(pages))
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryStream<'a> {
        let list_prefix = match self.list_prefix(prefix) {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            let mut paginator = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(list_prefix.clone())
                .into_paginator()
                .send();
            loop {
                let page = {
                    let _permit = match self.acquire_permit().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            yield Err(e);
                            break;
                        },
                    };
                    paginator.next().await
                };
                match page {
                    None => break,
                    Some(Ok(page)) => {
                        for object in page.contents() {
                            match self.entry(object) {
                                Ok(Some(entry)) => yield Ok(entry),
                                Ok(None) => {},
                                Err(e) => yield Err(e),
                            }
                        }
                    },
                    Some(Err(err)) => {
                        yield raise(err, list_prefix.as_deref().unwrap_or_default());
                        break;
                    },
                }
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let full = full_key(self.prefix.as_deref(), key)?;
        let _permit = self.acquire_permit().await?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&full).send().await {
            Ok(output) => output,
            Err(err) => return raise(err, key),
        };
        let body = output.body.collect().await.or_raise(|| ErrorKind::StoreUnavailable(key.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full = full_key(self.prefix.as_deref(), key)?;
        let _permit = self.acquire_permit().await?;
        match self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => raise(err, key),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // S3 deletes are idempotent; check first so a missing object is
        // reported the same way the other backends report it.
        if !self.exists(key).await? {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        let full = full_key(self.prefix.as_deref(), key)?;
        let _permit = self.acquire_permit().await?;
        match self.client.delete_object().bucket(&self.bucket).key(&full).send().await {
            Ok(_) => Ok(()),
            Err(err) => raise(err, key),
        }
    }

    async fn stat(&self, key: &str) -> Result<StorageEntry> {
        let full = full_key(self.prefix.as_deref(), key)?;
        let _permit = self.acquire_permit().await?;
        let output = match self.client.head_object().bucket(&self.bucket).key(&full).send().await {
            Ok(output) => output,
            Err(err) => return raise(err, key),
        };
        let modified = output.last_modified().map(parse_datetime).transpose()?;
        let size = output.content_length().unwrap_or(0).max(0) as u64;
        Ok(StorageEntry::new(validate_key(key)?, size, modified))
    }
}
