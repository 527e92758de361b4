//! Listing models.
//!
//! Object stores list in pages, and client libraries hand those pages back
//! as nested sequences. [`Listing`] keeps that shape so a listing can be
//! passed around as it was received and flattened where it's consumed.

use time::OffsetDateTime;

/// How many levels of nesting [`Listing::entries`] flattens.
pub const LISTING_DEPTH: usize = 3;

/// One object as reported by a storage backend.
///
/// Only the identifiers matter for naming. Size and modification time are
/// carried for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Key relative to the backend root.
    pub id: Option<String>,
    /// Key as the store names it, possibly including a folder prefix.
    pub name: Option<String>,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: Option<OffsetDateTime>,
}
impl StorageEntry {
    /// Create an entry whose id and name are both `key`.
    pub fn new(key: impl Into<String>, size: u64, modified: Option<OffsetDateTime>) -> Self {
        let key = key.into();
        Self {
            id: Some(key.clone()),
            name: Some(key),
            size,
            modified,
        }
    }

    /// An entry that carries nothing but an identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            size: 0,
            modified: None,
        }
    }

    /// The id, if it is present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// The name, if it is present and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// A possibly-nested listing of storage entries.
///
/// # Examples
///
/// ```
/// use dataname_storage::{Listing, StorageEntry};
///
/// let listing = Listing::Page(vec![
///     Listing::Entry(StorageEntry::with_id("a.csv")),
///     Listing::Page(vec![Listing::Entry(StorageEntry::with_id("b.csv"))]),
/// ]);
/// let ids: Vec<_> = listing.entries().into_iter().filter_map(StorageEntry::id).collect();
/// assert_eq!(ids, ["a.csv", "b.csv"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Entry(StorageEntry),
    Page(Vec<Listing>),
}
impl Listing {
    /// All entries nested at most [`LISTING_DEPTH`] levels below the top,
    /// in listing order.
    pub fn entries(&self) -> Vec<&StorageEntry> {
        self.flatten(LISTING_DEPTH)
    }

    /// All entries nested at most `depth` levels below the top, in listing
    /// order. Pages nested deeper than that are not entries and are skipped.
    pub fn flatten(&self, depth: usize) -> Vec<&StorageEntry> {
        let mut out = Vec::new();
        match self {
            Self::Entry(entry) => out.push(entry),
            Self::Page(items) => collect(items, depth, &mut out),
        }
        out
    }

    /// Consumes the listing, returning entries as [`flatten`](Self::flatten)
    /// does with [`LISTING_DEPTH`].
    pub fn into_entries(self) -> Vec<StorageEntry> {
        fn collect_owned(items: Vec<Listing>, depth: usize, out: &mut Vec<StorageEntry>) {
            for item in items {
                match item {
                    Listing::Entry(entry) => out.push(entry),
                    Listing::Page(nested) if depth > 0 => collect_owned(nested, depth - 1, out),
                    Listing::Page(_) => {},
                }
            }
        }
        let mut out = Vec::new();
        match self {
            Self::Entry(entry) => out.push(entry),
            Self::Page(items) => collect_owned(items, LISTING_DEPTH, &mut out),
        }
        out
    }

    /// Applies `f` to every entry, keeping the nesting as it is.
    pub fn map_entries<F: FnMut(StorageEntry) -> StorageEntry>(self, mut f: F) -> Self {
        fn walk<F: FnMut(StorageEntry) -> StorageEntry>(listing: Listing, f: &mut F) -> Listing {
            match listing {
                Listing::Entry(entry) => Listing::Entry(f(entry)),
                Listing::Page(items) => Listing::Page(items.into_iter().map(|item| walk(item, f)).collect()),
            }
        }
        walk(self, &mut f)
    }
}

fn collect<'a>(items: &'a [Listing], depth: usize, out: &mut Vec<&'a StorageEntry>) {
    for item in items {
        match item {
            Listing::Entry(entry) => out.push(entry),
            Listing::Page(nested) if depth > 0 => collect(nested, depth - 1, out),
            Listing::Page(_) => {},
        }
    }
}

impl From<StorageEntry> for Listing {
    fn from(entry: StorageEntry) -> Self {
        Self::Entry(entry)
    }
}
impl From<Vec<StorageEntry>> for Listing {
    fn from(entries: Vec<StorageEntry>) -> Self {
        entries.into_iter().collect()
    }
}
impl FromIterator<StorageEntry> for Listing {
    fn from_iter<I: IntoIterator<Item = StorageEntry>>(iter: I) -> Self {
        Self::Page(iter.into_iter().map(Self::Entry).collect())
    }
}
impl FromIterator<Listing> for Listing {
    fn from_iter<I: IntoIterator<Item = Listing>>(iter: I) -> Self {
        Self::Page(iter.into_iter().collect())
    }
}
