use crate::error::{ErrorKind, Result};
use async_stream::stream;
use dataname_naming::{Calendar, parse_in};
use dataname_schema::SchemaIndex;
use dataname_storage::{BackendHandle, StorageBackend, backend::ReadOnlyBackend};
use exn::ResultExt;
use futures::Stream;
use std::sync::Arc;

/// Progress of a [`prune`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneEvent {
    Started { dry_run: bool },
    /// The object's dataset name has a schema.
    Kept { key: String },
    /// The object had no schema and was deleted (or would have been, on a
    /// dry run).
    Deleted { key: String, name: Option<String> },
    Complete { kept: u64, deleted: u64 },
}

/// Delete every object whose dataset name has no schema.
///
/// Names are parsed from the last segment of each key, so objects in
/// folders are judged by their file name. With `dry_run` the backend is
/// wrapped in a [`ReadOnlyBackend`]: every deletion is reported and logged
/// but none is made.
///
/// The listing is taken up front, before anything is deleted. A failed
/// listing ends the stream; a failed deletion is yielded as an error and the
/// run carries on with the next object.
pub fn prune<'a>(
    backend: &'a BackendHandle,
    index: &'a SchemaIndex,
    prefix: Option<&'a str>,
    dry_run: bool,
    calendar: Calendar,
) -> impl Stream<Item = Result<PruneEvent>> + 'a {
    let backend: BackendHandle = match dry_run {
        true => Arc::new(ReadOnlyBackend::new(backend.clone())),
        false => backend.clone(),
    };
    stream! {
        yield Ok(PruneEvent::Started { dry_run });
        let entries = match backend.list(prefix).await.or_raise(|| ErrorKind::Listing) {
            Ok(entries) => entries,
            Err(e) => {
                yield Err(e);
                return;
            },
        };

        let (mut kept, mut deleted) = (0, 0);
        for entry in entries {
            let Some(key) = entry.id().map(str::to_owned) else {
                continue;
            };
            let file_name = key.rsplit_once('/').map_or(key.as_str(), |(_, file_name)| file_name);
            let record = parse_in(file_name, calendar);
            if record.name.as_deref().is_some_and(|name| index.has_name(name)) {
                kept += 1;
                yield Ok(PruneEvent::Kept { key });
                continue;
            }
            match backend.delete(&key).await.or_raise(|| ErrorKind::Delete(key.clone())) {
                Ok(()) => {
                    tracing::info!(key = %key, dry_run, "Deleted object without a schema");
                    deleted += 1;
                    yield Ok(PruneEvent::Deleted { key, name: record.name });
                },
                Err(e) => yield Err(e),
            }
        }
        yield Ok(PruneEvent::Complete { kept, deleted });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataname_storage::backend::MockBackend;
    use futures::StreamExt;

    fn store() -> BackendHandle {
        Arc::new(MockBackend::with_keys([
            "2024-05-01-sales.csv",
            "2024-05-01-unknown.csv",
            "imports/2024-05-02-stock_3.csv",
            "imports/notes.txt",
            "stock",
        ]))
    }

    async fn run(backend: &BackendHandle, index: &SchemaIndex, dry_run: bool) -> Vec<PruneEvent> {
        prune(backend, index, None, dry_run, Calendar::Utc).map(|e| e.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_prune_deletes_unlisted() {
        let backend = store();
        let index = SchemaIndex::from_names(["sales", "stock"]);
        let events = run(&backend, &index, false).await;

        assert_eq!(events.first(), Some(&PruneEvent::Started { dry_run: false }));
        assert_eq!(events.last(), Some(&PruneEvent::Complete { kept: 3, deleted: 2 }));
        assert!(events.contains(&PruneEvent::Deleted {
            key: "imports/notes.txt".to_string(),
            name: Some("notes.txt".to_string()),
        }));
        let remaining: Vec<_> = backend.list(None).await.unwrap().into_iter().filter_map(|e| e.id).collect();
        assert_eq!(remaining, ["2024-05-01-sales.csv", "imports/2024-05-02-stock_3.csv", "stock"]);
    }

    #[tokio::test]
    async fn test_prune_dry_run_keeps_everything() {
        let backend = store();
        let index = SchemaIndex::from_names(["sales"]);
        let events = run(&backend, &index, true).await;

        assert_eq!(events.last(), Some(&PruneEvent::Complete { kept: 1, deleted: 4 }));
        assert_eq!(backend.list(None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_prune_keeps_rolled_over_dates() {
        let backend: BackendHandle =
            Arc::new(MockBackend::with_keys(["2024-02-30-sales_2.csv", "2024-13-01-sales.csv"]));
        let index = SchemaIndex::from_names(["sales"]);
        let events = run(&backend, &index, false).await;
        assert_eq!(events.last(), Some(&PruneEvent::Complete { kept: 2, deleted: 0 }));
        assert_eq!(backend.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_prune_with_prefix() {
        let backend = store();
        let index = SchemaIndex::from_names(["sales", "stock"]);
        let events: Vec<_> =
            prune(&backend, &index, Some("imports/"), false, Calendar::Utc).map(|e| e.unwrap()).collect().await;
        assert_eq!(events.last(), Some(&PruneEvent::Complete { kept: 1, deleted: 1 }));
        assert!(backend.exists("2024-05-01-unknown.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_prune_listing_failure() {
        let backend = store();
        let index = SchemaIndex::default();
        let events: Vec<_> = prune(&backend, &index, Some("../"), false, Calendar::Utc).collect().await;
        assert_eq!(events.len(), 2);
        let err = events[1].as_ref().unwrap_err();
        assert!(matches!(&**err, ErrorKind::Listing));
    }
}
