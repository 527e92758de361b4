//! Ordering a raw store listing into dataset records.
//!
//! Both orderings start from the same flattened listing. Category order
//! buckets records by dataset name; date order re-buckets those by their
//! formatted date and sorts the buckets.

use dataname_naming::{Calendar, DatePattern, FilenameRecord, parse_in};
use dataname_storage::Listing;
use std::collections::{BTreeMap, HashMap};

/// Records from a listing, grouped by dataset name.
///
/// With `known` names, there is one bucket per name in the order given, and
/// entries whose parsed name isn't one of them are dropped. Without, every
/// distinct name gets a bucket in the order it is first seen. Within a
/// bucket, records keep their listing order. Entries without an identifier
/// are skipped.
///
/// `calendar` supplies the date of entries that don't follow the naming
/// convention.
///
/// ```
/// use dataname_catalog::group::group_by_category;
/// use dataname_naming::Calendar;
/// use dataname_storage::{Listing, StorageEntry};
///
/// let listing: Listing = ["2024-01-01-b1.csv", "2024-01-01-a.csv", "2024-01-01-c.csv"]
///     .into_iter()
///     .map(StorageEntry::with_id)
///     .collect();
/// let known = ["a".to_string(), "b1".to_string()];
/// let names: Vec<_> = group_by_category(&listing, Some(&known[..]), Calendar::Utc)
///     .into_iter()
///     .filter_map(|r| r.name)
///     .collect();
/// assert_eq!(names, ["a", "b1"]);
/// ```
#[tracing::instrument(level = "debug", skip_all, fields(known = known.map(<[String]>::len)))]
pub fn group_by_category(listing: &Listing, known: Option<&[String]>, calendar: Calendar) -> Vec<FilenameRecord> {
    let mut buckets: Vec<Vec<FilenameRecord>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for key in known.unwrap_or_default() {
        if !positions.contains_key(key) {
            positions.insert(key.clone(), buckets.len());
            buckets.push(Vec::new());
        }
    }

    let today = calendar.today();
    for entry in listing.entries() {
        let Some(id) = entry.id() else {
            tracing::debug!("Skipping listing entry without an identifier");
            continue;
        };
        let record = dataname_naming::parse_on(id, today);
        let name = record.name.clone().unwrap_or_default();
        match positions.get(&name) {
            Some(&position) => buckets[position].push(record),
            None if known.is_none() => {
                positions.insert(name, buckets.len());
                buckets.push(vec![record]);
            },
            None => tracing::debug!(id, name = %name, "Dropping entry with no known dataset name"),
        }
    }

    buckets.into_iter().flatten().collect()
}

/// Records from a listing in date order.
///
/// Records are grouped as [`group_by_category`] does, then bucketed by their
/// date formatted with `pattern`. Buckets come out in ascending order of
/// their formatted key, and records within a bucket keep category order.
///
/// Keys are compared as strings, so the result is only chronological when
/// `pattern` is zero-padded and starts with the largest unit, as the default
/// `YYYY-MM-DD` does. A pattern like `DD/MM/YYYY` sorts by day of month.
#[tracing::instrument(level = "debug", skip_all, fields(pattern = %pattern))]
pub fn group_by_date(
    listing: &Listing,
    known: Option<&[String]>,
    pattern: &DatePattern,
    calendar: Calendar,
) -> Vec<FilenameRecord> {
    let mut days: BTreeMap<String, Vec<FilenameRecord>> = BTreeMap::new();
    for record in group_by_category(listing, known, calendar) {
        days.entry(pattern.format_date(record.date)).or_default().push(record);
    }
    days.into_values().flatten().collect()
}

/// Parse every identifier in a listing, in listing order, without any
/// grouping.
pub fn records(listing: &Listing, calendar: Calendar) -> Vec<FilenameRecord> {
    listing.entries().into_iter().filter_map(|entry| entry.id()).map(|id| parse_in(id, calendar)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataname_storage::StorageEntry;
    use time::macros::date;

    fn listing(ids: &[&str]) -> Listing {
        ids.iter().copied().map(StorageEntry::with_id).collect()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn rendered(records: &[FilenameRecord]) -> Vec<String> {
        records.iter().map(FilenameRecord::render_full).collect()
    }

    #[test]
    fn test_known_keys_order_and_drop() {
        let listing = listing(&["2024-01-01-b.csv", "2024-01-01-a.csv", "2024-01-01-c.csv"]);
        let records = group_by_category(&listing, Some(keys(&["a", "b"]).as_slice()), Calendar::Utc);
        assert_eq!(rendered(&records), ["2024-01-01-a.csv", "2024-01-01-b.csv"]);
    }

    #[test]
    fn test_known_keys_keep_rolled_over_dates() {
        let listing = listing(&["2024-02-30-sales_2.csv", "2024-01-01-stock.csv"]);
        let records = group_by_category(&listing, Some(keys(&["sales"]).as_slice()), Calendar::Utc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date!(2024-03-01));
        assert_eq!(records[0].render_full(), "2024-03-01-sales_2.csv");
    }

    #[test]
    fn test_bucket_keeps_first_seen_order() {
        let listing = listing(&[
            "2024-01-03-sales.csv",
            "2024-01-01-stock.csv",
            "2024-01-01-sales_2.csv",
            "2024-01-02-sales.csv",
        ]);
        let records = group_by_category(&listing, Some(keys(&["sales", "stock"]).as_slice()), Calendar::Utc);
        assert_eq!(
            rendered(&records),
            [
                "2024-01-03-sales.csv",
                "2024-01-01-sales_2.csv",
                "2024-01-02-sales.csv",
                "2024-01-01-stock.csv"
            ]
        );
    }

    #[test]
    fn test_without_known_keys_buckets_by_encounter() {
        let listing = listing(&[
            "2024-01-01-b.csv",
            "2024-01-01-a.csv",
            "notes.txt",
            "2024-01-02-b.csv",
        ]);
        let records = group_by_category(&listing, None, Calendar::Utc);
        let names: Vec<_> = records.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, ["b", "b", "a", "notes.txt"]);
        assert!(!records[3].matched);
    }

    #[test]
    fn test_unmatched_and_missing_ids() {
        let mut entries = vec![Listing::Entry(StorageEntry::with_id("2024-01-01-a.csv"))];
        entries.push(Listing::Entry(StorageEntry::new("", 0, None)));
        entries.push(Listing::Entry(StorageEntry {
            id: None,
            name: Some("2024-01-01-a_1.csv".to_string()),
            size: 0,
            modified: None,
        }));
        entries.push(Listing::Entry(StorageEntry::with_id("imports/2024-01-01-a.csv")));
        let listing = Listing::Page(entries);
        let records = group_by_category(&listing, Some(keys(&["a"]).as_slice()), Calendar::Utc);
        assert_eq!(rendered(&records), ["2024-01-01-a.csv"]);
    }

    #[test]
    fn test_duplicate_known_keys() {
        let listing = listing(&["2024-01-01-a.csv"]);
        let records = group_by_category(&listing, Some(keys(&["a", "a"]).as_slice()), Calendar::Utc);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_empty_known_keys_drops_everything() {
        let listing = listing(&["2024-01-01-a.csv"]);
        assert!(group_by_category(&listing, Some(&[] as &[String]), Calendar::Utc).is_empty());
    }

    #[test]
    fn test_nested_pages() {
        let listing = Listing::Page(vec![
            Listing::Page(vec![Listing::Entry(StorageEntry::with_id("2024-01-01-a_1.csv"))]),
            Listing::Page(vec![Listing::Page(vec![Listing::Entry(StorageEntry::with_id("2024-01-01-a_2.csv"))])]),
        ]);
        let records = group_by_category(&listing, None, Calendar::Utc);
        assert_eq!(rendered(&records), ["2024-01-01-a_1.csv", "2024-01-01-a_2.csv"]);
    }

    #[test]
    fn test_group_by_date_sorts_days() {
        let listing = listing(&["2024-02-01-a.csv", "2024-01-15-b.csv", "2024-01-15-a.csv"]);
        let records = group_by_date(&listing, Some(keys(&["a", "b"]).as_slice()), &DatePattern::sortable(), Calendar::Utc);
        assert_eq!(rendered(&records), ["2024-01-15-a.csv", "2024-01-15-b.csv", "2024-02-01-a.csv"]);
    }

    #[test]
    fn test_group_by_date_coarse_pattern() {
        let listing = listing(&["2024-02-01-b.csv", "2024-01-20-b.csv", "2024-02-03-a.csv", "2023-12-31-a.csv"]);
        let records = group_by_date(&listing, None, &DatePattern::new("YYYY-MM"), Calendar::Utc);
        // Within a month, category order (b before a) wins over day order.
        assert_eq!(
            rendered(&records),
            ["2023-12-31-a.csv", "2024-01-20-b.csv", "2024-02-01-b.csv", "2024-02-03-a.csv"]
        );
    }

    #[test]
    fn test_group_by_date_unsortable_pattern_is_lexicographic() {
        let listing = listing(&["2024-01-02-a.csv", "2023-12-31-a.csv"]);
        let records = group_by_date(&listing, None, &DatePattern::new("DD/MM/YYYY"), Calendar::Utc);
        assert_eq!(rendered(&records), ["2024-01-02-a.csv", "2023-12-31-a.csv"]);
    }

    #[test]
    fn test_records() {
        let listing = listing(&["2024-01-01-a.csv", "notes.txt"]);
        let records = records(&listing, Calendar::Utc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, date!(2024-01-01));
        assert!(!records[1].matched);
    }
}
