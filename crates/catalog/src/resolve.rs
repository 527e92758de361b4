//! Choosing a filename that doesn't overwrite anything.
//!
//! Given the names already stored for a dated dataset, the next write gets
//! the following version number: `2024-05-01-sales_2.csv` exists, so write
//! `2024-05-01-sales_3.csv`.
//!
//! Two writers resolving the same name at once will both see the same
//! listing and pick the same version. Callers that can race need to
//! serialize the list-resolve-write sequence themselves.

use crate::error::{ErrorKind, Result};
use dataname_naming::{Calendar, DatePattern, FilenameRecord, parse_in, parse_on};
use dataname_storage::StorageBackend;
use exn::ResultExt;
use std::fmt;
use std::str::FromStr;

/// How existing names pick the version of the next one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Strategy {
    /// Increment the last name of the candidate's series in listing order.
    /// Stores list keys lexicographically, so `_10` sorts before `_9`.
    Latest,
    /// Increment the highest version among names with the same date, dataset
    /// name and extension as the candidate.
    #[default]
    Highest,
}
impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Latest => "latest",
            Self::Highest => "highest",
        })
    }
}
impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "highest" => Ok(Self::Highest),
            other => Err(format!("unknown strategy `{other}` (expected `latest` or `highest`)")),
        }
    }
}

/// Resolve a candidate against the names at its location, by position.
///
/// With no existing names, the candidate is parsed and returned as is.
/// Otherwise the last name is parsed and its version incremented. Empty
/// names don't count.
///
/// ```
/// use dataname_catalog::resolve::resolve;
///
/// let record = resolve(["2024-05-01-sales_2.csv"], "2024-05-01-sales.csv");
/// assert_eq!(record.name.as_deref(), Some("sales"));
/// assert_eq!(record.version, 3);
///
/// let record = resolve(Vec::<String>::new(), "2024-05-01-sales.csv");
/// assert_eq!(record.version, 0);
/// ```
pub fn resolve<I, S>(existing: I, candidate: &str) -> FilenameRecord
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    resolve_in(existing, candidate, Calendar::Utc)
}

/// [`resolve`], dating names that don't follow the convention in `calendar`.
pub fn resolve_in<I, S>(existing: I, candidate: &str, calendar: Calendar) -> FilenameRecord
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let last = existing.into_iter().filter(|name| !name.as_ref().is_empty()).last();
    match last {
        Some(last) => parse_in(last.as_ref(), calendar).increment_version(),
        None => parse_in(candidate, calendar),
    }
}

/// Resolve a candidate against the names at its location, by version.
///
/// Only names with the candidate's date, dataset name and extension (in any
/// case) are considered. The one with the highest version is incremented;
/// when there is none the candidate is returned as parsed. Gives the same
/// result as [`resolve`] whenever the listing is in version order.
///
/// ```
/// use dataname_catalog::resolve::resolve_highest;
/// use dataname_naming::Calendar;
///
/// let existing = ["2024-05-01-sales_10.csv", "2024-05-01-sales_9.csv"];
/// let record = resolve_highest(existing, "2024-05-01-sales.csv", Calendar::Utc);
/// assert_eq!(record.version, 11);
/// ```
pub fn resolve_highest<I, S>(existing: I, candidate: &str, calendar: Calendar) -> FilenameRecord
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let today = calendar.today();
    let candidate = parse_on(candidate, today);
    existing
        .into_iter()
        .filter(|name| !name.as_ref().is_empty())
        .map(|name| parse_on(name.as_ref(), today))
        .filter(|record| same_series(record, &candidate))
        .max_by_key(|record| record.version)
        .map_or(candidate, FilenameRecord::increment_version)
}

fn same_series(record: &FilenameRecord, candidate: &FilenameRecord) -> bool {
    record.matched == candidate.matched
        && record.date == candidate.date
        && record.name == candidate.name
        && match (&record.extension, &candidate.extension) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a == b,
        }
}

/// Remove a leading `folder/` from a stored name.
///
/// ```
/// use dataname_catalog::resolve::strip_folder;
///
/// assert_eq!(strip_folder("imports/2024-05-01-sales.csv", Some("imports")), "2024-05-01-sales.csv");
/// assert_eq!(strip_folder("other/2024-05-01-sales.csv", Some("imports/")), "other/2024-05-01-sales.csv");
/// assert_eq!(strip_folder("2024-05-01-sales.csv", None), "2024-05-01-sales.csv");
/// ```
pub fn strip_folder<'a>(name: &'a str, folder: Option<&str>) -> &'a str {
    match folder.map(|f| f.trim_end_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => name.strip_prefix(folder).and_then(|rest| rest.strip_prefix('/')).unwrap_or(name),
        None => name,
    }
}

/// The listing prefix that finds every version of `candidate` in `folder`.
///
/// For a conventional name that is `folder/{date}-{name}`, which takes in
/// every `_N` suffix. Anything else is looked up by its full name.
pub fn series_prefix(candidate: &FilenameRecord, folder: Option<&str>) -> String {
    let stem = match (&candidate.name, candidate.matched) {
        (Some(name), true) => format!("{}-{name}", DatePattern::sortable().format_date(candidate.date)),
        (Some(name), false) => name.clone(),
        (None, _) => String::new(),
    };
    match folder.map(|f| f.trim_end_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{folder}/{stem}"),
        None => stem,
    }
}

/// Resolve a candidate filename against what is already stored in `folder`.
///
/// Lists the store under the candidate's [`series_prefix`], strips the
/// folder from each stored name and keeps only the candidate's own series
/// (same date, dataset name and extension). Those names are resolved with
/// `strategy`.
///
/// # Errors
///
/// [`Listing`](ErrorKind::Listing) if the store can't be listed; the storage
/// error underneath says whether it was unreachable or refused access.
/// [`NameTaken`](ErrorKind::NameTaken) if the resolved name is already
/// stored. That happens with [`Strategy::Latest`] once a series passes `_9`,
/// and with either strategy once versions reach `u32::MAX`.
#[tracing::instrument(skip(backend), fields(store = backend.name()))]
pub async fn safe_filename(
    backend: &dyn StorageBackend,
    candidate: &str,
    folder: Option<&str>,
    strategy: Strategy,
    calendar: Calendar,
) -> Result<FilenameRecord> {
    let today = calendar.today();
    let parsed = parse_on(candidate, today);
    let prefix = series_prefix(&parsed, folder);
    let listing = backend
        .list_pages(Some(prefix.as_str()).filter(|p| !p.is_empty()))
        .await
        .or_raise(|| ErrorKind::Listing)?;
    let existing: Vec<FilenameRecord> = listing
        .entries()
        .into_iter()
        .filter_map(|entry| entry.name().or(entry.id()))
        .map(|name| parse_on(strip_folder(name, folder), today))
        .filter(|record| same_series(record, &parsed))
        .collect();
    tracing::debug!(prefix = %prefix, existing = existing.len(), "Listed existing names");

    let record = match (strategy, existing.last()) {
        (_, None) => parsed,
        (Strategy::Latest, Some(last)) => last.clone().increment_version(),
        (Strategy::Highest, Some(_)) => existing
            .iter()
            .max_by_key(|record| record.version)
            .map_or(parsed, |highest| highest.clone().increment_version()),
    };
    if existing.iter().any(|stored| stored.version == record.version) {
        exn::bail!(ErrorKind::NameTaken(record.render()));
    }
    tracing::info!(resolved = %record, "Resolved safe filename");
    Ok(record)
}
