use crate::error::{ErrorKind, Result};
use crate::group::{group_by_category, group_by_date};
use crate::resolve::strip_folder;
use dataname_naming::{Calendar, DatePattern, FilenameRecord};
use dataname_schema::SchemaIndex;
use dataname_storage::{StorageBackend, StorageEntry};
use exn::ResultExt;
use std::fmt;
use std::str::FromStr;

/// Which ordering [`ordered_listing`] produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Order {
    /// By dataset name, see [`group_by_category`].
    #[default]
    Category,
    /// By date, see [`group_by_date`].
    Date,
}
impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Date => "date",
        })
    }
}
impl FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "date" => Ok(Self::Date),
            other => Err(format!("unknown order `{other}` (expected `category` or `date`)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions<'a> {
    pub order: Order,
    /// Only keep records whose dataset name is in the index.
    pub schemas: Option<&'a SchemaIndex>,
    /// Bucket key for [`Order::Date`].
    pub pattern: DatePattern,
    pub calendar: Calendar,
}

/// List `folder` and order what is in it.
///
/// Keys are made relative to `folder` before they are parsed, so
/// `imports/2024-05-01-sales.csv` listed in `imports` reads as
/// `2024-05-01-sales.csv`. Objects in deeper folders keep the rest of their
/// path and won't match the naming convention.
#[tracing::instrument(skip(backend, options), fields(store = backend.name(), order = %options.order))]
pub async fn ordered_listing(
    backend: &dyn StorageBackend,
    folder: Option<&str>,
    options: &ListOptions<'_>,
) -> Result<Vec<FilenameRecord>> {
    let prefix = folder.map(|f| format!("{}/", f.trim_end_matches('/'))).filter(|p| p != "/");
    let listing = backend.list_pages(prefix.as_deref()).await.or_raise(|| ErrorKind::Listing)?;
    let listing = listing.map_entries(|entry| StorageEntry {
        id: entry.id.as_deref().map(|id| strip_folder(id, folder).to_string()),
        ..entry
    });

    let known = options.schemas.map(SchemaIndex::names);
    let records = match options.order {
        Order::Category => group_by_category(&listing, known, options.calendar),
        Order::Date => group_by_date(&listing, known, &options.pattern, options.calendar),
    };
    tracing::debug!(records = records.len(), "Ordered listing");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataname_storage::backend::MockBackend;

    fn store() -> MockBackend {
        MockBackend::with_keys([
            "imports/2024-02-01-stock.csv",
            "imports/2024-01-15-sales.csv",
            "imports/2024-01-15-stock_1.csv",
            "imports/2024-01-15-unknown.csv",
            "imports/nested/2024-01-01-sales.csv",
            "2024-01-01-sales.csv",
        ])
    }

    fn rendered(records: &[FilenameRecord]) -> Vec<String> {
        records.iter().map(FilenameRecord::render_full).collect()
    }

    #[tokio::test]
    async fn test_category_order_with_schemas() {
        let backend = store();
        let index = SchemaIndex::from_names(["stock", "sales"]);
        let options = ListOptions {
            schemas: Some(&index),
            ..Default::default()
        };
        let records = ordered_listing(&backend, Some("imports"), &options).await.unwrap();
        assert_eq!(
            rendered(&records),
            ["2024-01-15-sales.csv", "2024-01-15-stock_1.csv", "2024-02-01-stock.csv"]
        );
    }

    #[tokio::test]
    async fn test_date_order() {
        let backend = store();
        let index = SchemaIndex::from_names(["stock", "sales"]);
        let options = ListOptions {
            order: Order::Date,
            schemas: Some(&index),
            ..Default::default()
        };
        let records = ordered_listing(&backend, Some("imports/"), &options).await.unwrap();
        assert_eq!(
            rendered(&records),
            ["2024-01-15-sales.csv", "2024-01-15-stock_1.csv", "2024-02-01-stock.csv"]
        );
    }

    #[tokio::test]
    async fn test_without_folder_or_schemas() {
        let backend = store();
        let records = ordered_listing(&backend, None, &ListOptions::default()).await.unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].render_full(), "2024-01-01-sales.csv");
        assert_eq!(records.iter().filter(|r| r.matched).count(), 1);
    }

    #[test]
    fn test_order_from_str() {
        assert_eq!("date".parse::<Order>().unwrap(), Order::Date);
        assert_eq!("Category".parse::<Order>().unwrap(), Order::Category);
        assert!("size".parse::<Order>().is_err());
    }
}
