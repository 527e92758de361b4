use crate::consts::VERSION_SEPARATOR;

/// Extracts the trailing version number from a name fragment.
///
/// Only the segment after the last `_` is inspected, and only its leading
/// ASCII digits count (`report_7` and `report_7.csv` are both version 7).
/// Anything else is version 0: no separator, no leading digits, or a number
/// too large to represent.
///
/// ```
/// use dataname_naming::version::extract_version;
///
/// assert_eq!(extract_version("report_7"), 7);
/// assert_eq!(extract_version("report"), 0);
/// assert_eq!(extract_version("report_x"), 0);
/// ```
pub fn extract_version(fragment: &str) -> u32 {
    let Some((_, last)) = fragment.rsplit_once(VERSION_SEPARATOR) else {
        return 0;
    };
    let digits = last.find(|c: char| !c.is_ascii_digit()).unwrap_or(last.len());
    last[..digits].parse().unwrap_or(0)
}

/// Appends the version suffix to a dataset name, omitting it for version 0.
pub(crate) fn with_version(name: &str, version: u32) -> String {
    match version {
        0 => name.to_string(),
        v => format!("{name}{VERSION_SEPARATOR}{v}"),
    }
}
