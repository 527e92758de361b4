//! Names of the warehouse tables that dataset files are loaded into.

use crate::date::DatePattern;
use crate::filename::FilenameRecord;
use time::Date;

/// Suffix distinguishing one day's temporary load table from another's.
pub fn temporary_table_suffix(date: Date) -> String {
    DatePattern::sortable().format_date(date)
}

/// Name of the temporary table a file is staged into before merging:
/// `{prefix}{name}-{version}-{YYYY-MM-DD}`.
///
/// Each version of each day gets its own table, so re-delivered files never
/// collide with the load of the file they replace.
pub fn temporary_table_name(record: &FilenameRecord, prefix: &str) -> String {
    format!(
        "{prefix}{}-{}-{}",
        record.name.as_deref().unwrap_or_default(),
        record.version,
        temporary_table_suffix(record.date),
    )
}
