//! The `YYYY-MM-DD-NAME[_VERSION].EXT` filename grammar.
//!
//! [`parse`] never fails. Names that don't follow the grammar still produce a
//! [`FilenameRecord`], flagged with `matched: false`, whose fields are
//! best-effort guesses. Object stores hold whatever producers put there, and
//! every reader of a listing has to cope with it.

use crate::consts;
use crate::date::{Calendar, DatePattern, parts_to_date};
use crate::version::{extract_version, with_version};
use std::fmt;
use time::{Date, OffsetDateTime};

/// The parsed representation of a dataset filename.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FilenameRecord {
    /// Date encoded in the filename, or the processing date if the filename
    /// didn't match.
    pub date: Date,
    /// Dataset name with the version suffix and extension stripped. `None`
    /// only for empty input.
    pub name: Option<String>,
    /// Name fragment before the extension, including any version suffix.
    pub full_name: Option<String>,
    /// Extension without the leading dot, case preserved.
    pub extension: Option<String>,
    /// Version suffix; `0` means no explicit version.
    pub version: u32,
    /// Whether the filename followed the canonical grammar.
    pub matched: bool,
}

impl FilenameRecord {
    /// Assembles a record from its parts, as a producer does before writing a
    /// new file. The record didn't come from a filename, so it isn't
    /// `matched`.
    pub fn new(date: Date, name: impl Into<String>, extension: impl Into<String>, version: u32) -> Self {
        let name = name.into();
        Self {
            date,
            full_name: Some(with_version(&name, version)),
            name: Some(name),
            extension: Some(extension.into()),
            version,
            matched: false,
        }
    }

    /// Returns the record with its version bumped.
    ///
    /// Version 0 (no explicit version) becomes 1; anything else goes up by
    /// one. At `u32::MAX` the version stays put, so the result names the same
    /// file as `self`. Suffixes too large for a `u32` parse as version 0.
    #[must_use]
    pub fn increment_version(mut self) -> Self {
        self.version = self.version.saturating_add(1);
        self
    }

    /// Renders the canonical filename:
    /// `{YYYY-MM-DD}-{name}[_{version}].{extension}`.
    ///
    /// The extension is lowercased and the version suffix is omitted for
    /// version 0. A record without an extension renders without the dot.
    ///
    /// ```
    /// use dataname_naming::filename::FilenameRecord;
    /// use time::macros::date;
    ///
    /// let record = FilenameRecord::new(date!(2024-05-01), "sales", "CSV", 2);
    /// assert_eq!(record.render(), "2024-05-01-sales_2.csv");
    /// ```
    pub fn render(&self) -> String {
        let name = with_version(self.name.as_deref().unwrap_or_default(), self.version);
        let extension = self.extension.as_deref().map(str::to_lowercase);
        join(self.date, &name, extension.as_deref())
    }

    /// Renders `{YYYY-MM-DD}-{full_name}.{extension}`, reproducing the name
    /// fragment and extension exactly as they were parsed.
    pub fn render_full(&self) -> String {
        join(self.date, self.full_name.as_deref().unwrap_or_default(), self.extension.as_deref())
    }

    /// Whether the extension matches `extension`, ignoring ASCII case.
    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension.as_deref().is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
impl fmt::Display for FilenameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn join(date: Date, name: &str, extension: Option<&str>) -> String {
    let date = DatePattern::sortable().format_date(date);
    match extension {
        Some(ext) => format!("{date}-{name}.{ext}"),
        None => format!("{date}-{name}"),
    }
}

/// Parses a filename, using today's UTC date for names that don't match.
///
/// ```
/// use dataname_naming::filename::parse;
///
/// let record = parse("2024-05-01-sales_2.csv");
/// assert!(record.matched);
/// assert_eq!(record.name.as_deref(), Some("sales"));
/// assert_eq!(record.full_name.as_deref(), Some("sales_2"));
/// assert_eq!(record.version, 2);
///
/// assert!(!parse("notes.txt").matched);
/// assert!(parse(None::<&str>).name.is_none());
/// ```
pub fn parse<'a>(filename: impl Into<Option<&'a str>>) -> FilenameRecord {
    parse_in(filename, Calendar::Utc)
}

/// Parses a filename, using today's date in `calendar` for names that don't
/// match.
pub fn parse_in<'a>(filename: impl Into<Option<&'a str>>, calendar: Calendar) -> FilenameRecord {
    parse_on(filename, calendar.today())
}

/// Parses a filename, using `today` as the date of names that don't match.
pub fn parse_on<'a>(filename: impl Into<Option<&'a str>>, today: Date) -> FilenameRecord {
    let filename = match filename.into() {
        Some(f) if !f.is_empty() => f,
        _ => {
            return FilenameRecord {
                date: today,
                name: None,
                full_name: None,
                extension: None,
                version: 0,
                matched: false,
            };
        },
    };
    canonical(filename).unwrap_or_else(|| FilenameRecord {
        date: today,
        name: Some(filename.to_string()),
        full_name: Some(filename.to_string()),
        extension: filename.rsplit_once('.').map(|(_, ext)| ext.to_string()),
        version: extract_version(filename),
        matched: false,
    })
}

/// Matches the canonical grammar. Out-of-range dates roll over
/// (`2024-02-30` is dated March 1st) and still count as matched.
fn canonical(filename: &str) -> Option<FilenameRecord> {
    let captures = consts::FILENAME_REGEX.captures(filename)?;
    let date = parts_to_date(&captures["year"], &captures["month"], &captures["day"])?;
    let full_name = &captures["full"];
    let name = captures.name("base").map_or(full_name, |base| base.as_str());
    Some(FilenameRecord {
        date,
        name: Some(name.to_string()),
        full_name: Some(full_name.to_string()),
        extension: Some(captures["ext"].to_string()),
        version: extract_version(full_name),
        matched: true,
    })
}

/// Builds the time-bucketed path of a JSON log artifact:
/// `{YYYY-MM-DD}/{YYYYMMDDHHmmss}-{base_name}.json`.
///
/// Both tokens are read from `datetime` as seen in `calendar`. These paths
/// are never versioned.
pub fn json_log_name(datetime: OffsetDateTime, base_name: &str, calendar: Calendar) -> String {
    let datetime = calendar.normalize(datetime);
    format!(
        "{}/{}-{base_name}.json",
        DatePattern::sortable().format(datetime),
        DatePattern::timestamp().format(datetime),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::Month;
    use time::macros::{date, datetime};

    const TODAY: Date = date!(2000-01-01);

    #[test]
    fn test_parse_canonical_unversioned() {
        let record = parse_on("2024-05-01-sales.csv", TODAY);
        assert_eq!(
            record,
            FilenameRecord {
                date: date!(2024-05-01),
                name: Some("sales".to_string()),
                full_name: Some("sales".to_string()),
                extension: Some("csv".to_string()),
                version: 0,
                matched: true,
            }
        );
    }

    #[rstest]
    #[case("2024-05-01-sales_2.csv", "sales", "sales_2", 2)]
    #[case("2024-05-01-daily_sales.csv", "daily_sales", "daily_sales", 0)]
    #[case("2024-05-01-daily_sales_10.csv", "daily_sales", "daily_sales_10", 10)]
    #[case("2024-05-01-sales_2_3.csv", "sales_2", "sales_2_3", 3)]
    #[case("2024-05-01-eu-sales.csv", "eu-sales", "eu-sales", 0)]
    #[case("2024-05-01-2024.csv", "2024", "2024", 0)]
    #[case("2024-05-01-sales_.csv", "sales_", "sales_", 0)]
    fn test_parse_canonical_names(
        #[case] filename: &str,
        #[case] name: &str,
        #[case] full_name: &str,
        #[case] version: u32,
    ) {
        let record = parse_on(filename, TODAY);
        assert!(record.matched);
        assert_eq!(record.name.as_deref(), Some(name));
        assert_eq!(record.full_name.as_deref(), Some(full_name));
        assert_eq!(record.version, version);
    }

    #[rstest]
    #[case("2024-02-30-sales_2.csv", date!(2024-03-01), 2)]
    #[case("2024-13-01-sales.csv", date!(2025-01-01), 0)]
    #[case("2023-02-29-sales.csv", date!(2023-03-01), 0)]
    fn test_parse_rolls_over_out_of_range_dates(#[case] filename: &str, #[case] expected: Date, #[case] version: u32) {
        let record = parse_on(filename, TODAY);
        assert!(record.matched);
        assert_eq!(record.date, expected);
        assert_eq!(record.name.as_deref(), Some("sales"));
        assert_eq!(record.extension.as_deref(), Some("csv"));
        assert_eq!(record.version, version);
    }

    #[test]
    fn test_parse_keeps_extension_case() {
        let record = parse_on("2024-05-01-sales.CSV", TODAY);
        assert!(record.matched);
        assert_eq!(record.extension.as_deref(), Some("CSV"));
        assert!(record.has_extension("csv"));
    }

    #[rstest]
    #[case("notes.txt", Some("txt"), 0)]
    #[case("archive.tar.gz", Some("gz"), 0)]
    #[case("README", None, 0)]
    #[case("2024-05-01-sales.tar.gz", Some("gz"), 0)]
    #[case("2024-05-01-sales_4.csv.bak", Some("bak"), 4)]
    #[case("2024-5-1-sales.csv", Some("csv"), 0)]
    #[case("2024-05-01-sales", None, 0)]
    #[case("2024-05-01-.csv", Some("csv"), 0)]
    #[case("2024-05-01-sales report.csv", Some("csv"), 0)]
    #[case("x2024-05-01-sales.csv", Some("csv"), 0)]
    #[case("folder/2024-05-01-sales.csv", Some("csv"), 0)]
    #[case("report_3", None, 3)]
    fn test_parse_fallback(#[case] filename: &str, #[case] extension: Option<&str>, #[case] version: u32) {
        let record = parse_on(filename, TODAY);
        assert!(!record.matched);
        assert_eq!(record.date, TODAY);
        assert_eq!(record.name.as_deref(), Some(filename));
        assert_eq!(record.full_name.as_deref(), Some(filename));
        assert_eq!(record.extension.as_deref(), extension);
        assert_eq!(record.version, version);
    }

    #[test]
    fn test_parse_empty() {
        for record in [parse_on("", TODAY), parse_on(None::<&str>, TODAY)] {
            assert!(!record.matched);
            assert_eq!(record.date, TODAY);
            assert_eq!(record.name, None);
            assert_eq!(record.full_name, None);
            assert_eq!(record.extension, None);
            assert_eq!(record.version, 0);
        }
    }

    #[test]
    fn test_parse_unicode_digits_do_not_match() {
        // Arabic-Indic digits are `\d` in Unicode mode.
        let record = parse_on("٢٠٢٤-٠٥-٠١-sales.csv", TODAY);
        assert!(!record.matched);
    }

    #[test]
    fn test_parse_uses_calendar_today() {
        let before = OffsetDateTime::now_utc().date();
        let record = parse_in("unstructured", Calendar::Utc);
        let after = OffsetDateTime::now_utc().date();
        assert!(record.date == before || record.date == after);
    }

    #[rstest]
    #[case(date!(2024-05-01), "sales", "csv", 0, "2024-05-01-sales.csv")]
    #[case(date!(2024-05-01), "sales", "CSV", 3, "2024-05-01-sales_3.csv")]
    #[case(Date::from_calendar_date(987, Month::January, 9).unwrap(), "daily_sales", "Json", 1, "0987-01-09-daily_sales_1.json")]
    fn test_render(
        #[case] date: Date,
        #[case] name: &str,
        #[case] extension: &str,
        #[case] version: u32,
        #[case] expected: &str,
    ) {
        let record = FilenameRecord::new(date, name, extension, version);
        assert_eq!(record.render(), expected);
        assert_eq!(record.to_string(), expected);
    }

    #[test]
    fn test_render_without_extension() {
        let mut record = FilenameRecord::new(date!(2024-05-01), "sales", "csv", 0);
        record.extension = None;
        assert_eq!(record.render(), "2024-05-01-sales");
    }

    #[test]
    fn test_render_full_preserves_fragment() {
        let record = parse_on("2024-05-01-Sales_07.CSV", TODAY);
        assert_eq!(record.render_full(), "2024-05-01-Sales_07.CSV");
        assert_eq!(record.render(), "2024-05-01-Sales_7.csv");
    }

    #[rstest]
    #[case(date!(2024-05-01), "sales", "CSV", 0)]
    #[case(date!(2024-12-31), "daily_sales", "json", 7)]
    #[case(date!(1970-01-01), "eu-sales_v", "Parquet", 123)]
    #[case(date!(2024-02-29), "2024", "csv", 1)]
    fn test_render_then_parse(#[case] date: Date, #[case] name: &str, #[case] extension: &str, #[case] version: u32) {
        let record = parse_on(FilenameRecord::new(date, name, extension, version).render().as_str(), TODAY);
        assert!(record.matched);
        assert_eq!(record.date, date);
        assert_eq!(record.name.as_deref(), Some(name));
        assert_eq!(record.extension, Some(extension.to_lowercase()));
        assert_eq!(record.version, version);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(3, 4)]
    #[case(u32::MAX, u32::MAX)]
    fn test_increment_version(#[case] version: u32, #[case] expected: u32) {
        let record = FilenameRecord::new(TODAY, "sales", "csv", version);
        assert_eq!(record.increment_version().version, expected);
    }

    #[test]
    fn test_increment_unversioned_parse() {
        let record = parse_on("2024-05-01-sales.csv", TODAY).increment_version();
        assert_eq!(record.render(), "2024-05-01-sales_1.csv");
    }

    #[test]
    fn test_json_log_name() {
        let datetime = datetime!(2024-03-07 09:05:02 UTC);
        assert_eq!(
            json_log_name(datetime, "events", Calendar::Utc),
            "2024-03-07/20240307090502-events.json"
        );
    }

    #[test]
    fn test_json_log_name_calendar() {
        let datetime = datetime!(2024-03-07 00:30:00 +01:00);
        assert_eq!(json_log_name(datetime, "events", Calendar::Utc), "2024-03-06/20240306233000-events.json");
        assert_eq!(json_log_name(datetime, "events", Calendar::Local), "2024-03-07/20240307003000-events.json");
    }
}
