//! Calendar dates and their textual tokens.
//!
//! Filenames carry their date as a fixed-width, zero-padded, big-endian token
//! (`YYYY-MM-DD`), which is what makes plain string sorting of date buckets
//! equivalent to chronological sorting. [`DatePattern`] renders dates using
//! the same token vocabulary producers use when naming files:
//!
//! | Token  | Output                         |
//! |--------|--------------------------------|
//! | `YYYY` | four-digit year                |
//! | `YY`   | last two digits of the year    |
//! | `MM`   | month, zero-padded (`01`-`12`) |
//! | `M`    | month (`1`-`12`)               |
//! | `DD`   | day, zero-padded               |
//! | `D`    | day                            |
//! | `HH`   | hour (24h), zero-padded        |
//! | `H`    | hour (24h)                     |
//! | `mm`   | minute, zero-padded            |
//! | `m`    | minute                         |
//! | `ss`   | second, zero-padded            |
//! | `s`    | second                         |
//!
//! Text wrapped in square brackets is emitted verbatim (`[at] HH:mm`). Any
//! other character is a literal.

use crate::consts;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Which calendar "today" and timestamps are evaluated in.
///
/// Near midnight the local and UTC calendars disagree on the current day, so
/// the choice is always explicit rather than an implicit default of the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum Calendar {
    /// The host's local offset. Timestamps are formatted with the offset they
    /// already carry.
    Local,
    /// Coordinated Universal Time. Timestamps are converted to UTC before
    /// their fields are read.
    #[default]
    Utc,
}
impl Calendar {
    /// The current instant in this calendar.
    ///
    /// The local offset can't always be determined (notably in multi-threaded
    /// processes on some Unix platforms); UTC is used when it can't.
    pub fn now(self) -> OffsetDateTime {
        match self {
            Self::Utc => OffsetDateTime::now_utc(),
            Self::Local => OffsetDateTime::now_local().unwrap_or_else(|_| {
                tracing::debug!("local offset is indeterminate, falling back to UTC");
                OffsetDateTime::now_utc()
            }),
        }
    }

    /// The current processing date in this calendar.
    pub fn today(self) -> Date {
        self.now().date()
    }

    /// Strips the offset from `datetime`, converting to UTC first for
    /// [`Calendar::Utc`].
    pub fn normalize(self, datetime: OffsetDateTime) -> PrimitiveDateTime {
        let datetime = match self {
            Self::Local => datetime,
            Self::Utc => datetime.to_offset(UtcOffset::UTC),
        };
        PrimitiveDateTime::new(datetime.date(), datetime.time())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Year,
    ShortYear,
    PaddedMonth,
    Month,
    PaddedDay,
    Day,
    PaddedHour,
    Hour,
    PaddedMinute,
    Minute,
    PaddedSecond,
    Second,
}

// Longest tokens first so `YYYY` wins over `YY`.
const TOKENS: [(&str, Token); 12] = [
    ("YYYY", Token::Year),
    ("YY", Token::ShortYear),
    ("MM", Token::PaddedMonth),
    ("M", Token::Month),
    ("DD", Token::PaddedDay),
    ("D", Token::Day),
    ("HH", Token::PaddedHour),
    ("H", Token::Hour),
    ("mm", Token::PaddedMinute),
    ("m", Token::Minute),
    ("ss", Token::PaddedSecond),
    ("s", Token::Second),
];

/// A compiled date formatting pattern.
///
/// Compiling never fails: anything that isn't a token is a literal. Compile
/// once and reuse; [`format`](Self::format) only walks the token list.
///
/// # Examples
///
/// ```
/// use dataname_naming::date::DatePattern;
/// use time::macros::datetime;
///
/// let pattern = DatePattern::new("YYYYMMDDHHmmss");
/// assert_eq!(pattern.format(datetime!(2024-03-07 09:05:02)), "20240307090502");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(from = "String", into = "String"))]
pub struct DatePattern {
    source: String,
    tokens: Vec<Token>,
}
impl DatePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let tokens = tokenize(&source);
        Self { source, tokens }
    }

    /// The canonical, sortable `YYYY-MM-DD` pattern.
    pub fn sortable() -> Self {
        Self::new(consts::SORTABLE_DATE)
    }

    /// The compact `YYYYMMDDHHmmss` timestamp pattern.
    pub fn timestamp() -> Self {
        Self::new(consts::TIMESTAMP)
    }

    /// The pattern as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders a date-time with no time zone conversion.
    pub fn format(&self, datetime: PrimitiveDateTime) -> String {
        let mut out = String::with_capacity(self.source.len() + 4);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Year => out.push_str(&format!("{:04}", datetime.year())),
                Token::ShortYear => out.push_str(&format!("{:02}", datetime.year().rem_euclid(100))),
                Token::PaddedMonth => out.push_str(&format!("{:02}", u8::from(datetime.month()))),
                Token::Month => out.push_str(&u8::from(datetime.month()).to_string()),
                Token::PaddedDay => out.push_str(&format!("{:02}", datetime.day())),
                Token::Day => out.push_str(&datetime.day().to_string()),
                Token::PaddedHour => out.push_str(&format!("{:02}", datetime.hour())),
                Token::Hour => out.push_str(&datetime.hour().to_string()),
                Token::PaddedMinute => out.push_str(&format!("{:02}", datetime.minute())),
                Token::Minute => out.push_str(&datetime.minute().to_string()),
                Token::PaddedSecond => out.push_str(&format!("{:02}", datetime.second())),
                Token::Second => out.push_str(&datetime.second().to_string()),
            }
        }
        out
    }

    /// Renders a calendar date; time tokens render as midnight.
    pub fn format_date(&self, date: Date) -> String {
        self.format(date.midnight())
    }

    /// Renders an offset date-time in the given [`Calendar`].
    pub fn format_in(&self, datetime: OffsetDateTime, calendar: Calendar) -> String {
        self.format(calendar.normalize(datetime))
    }
}
impl Default for DatePattern {
    fn default() -> Self {
        Self::sortable()
    }
}
impl FromStr for DatePattern {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
impl From<String> for DatePattern {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
impl From<&str> for DatePattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl From<DatePattern> for String {
    fn from(value: DatePattern) -> Self {
        value.source
    }
}
impl fmt::Display for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    fn push_literal(tokens: &mut Vec<Token>, text: &str) {
        match tokens.last_mut() {
            Some(Token::Literal(existing)) => existing.push_str(text),
            _ => tokens.push(Token::Literal(text.to_string())),
        }
    }

    let mut tokens = Vec::new();
    let mut rest = pattern;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '['
            && let Some(end) = rest.find(']')
        {
            push_literal(&mut tokens, &rest[1..end]);
            rest = &rest[end + 1..];
            continue;
        }
        for (text, token) in &TOKENS {
            if let Some(remaining) = rest.strip_prefix(text) {
                tokens.push(token.clone());
                rest = remaining;
                continue 'outer;
            }
        }
        push_literal(&mut tokens, &rest[..c.len_utf8()]);
        rest = &rest[c.len_utf8()..];
    }
    tokens
}

/// Builds a date from year, 1-based month, and day substrings.
///
/// Months and days outside the calendar roll over into the neighbouring
/// period: `2024-02-30` is March 1st, month 13 is January of the next year,
/// and day `00` is the last day of the previous month.
///
/// Returns `None` (the invalid-date sentinel) if any part is non-numeric or
/// the result falls outside the representable range. Callers must check.
pub fn parts_to_date(year: &str, month: &str, day: &str) -> Option<Date> {
    let year = year.parse::<i64>().ok()?;
    let month = month.parse::<i64>().ok()?;
    let day = day.parse::<i64>().ok()?;
    let months = year.checked_mul(12)?.checked_add(month - 1)?;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(months.rem_euclid(12) + 1).ok()?).ok()?;
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    first.checked_add(Duration::days(day - 1))
}

/// Strictly validates and converts a `YYYY-MM-DD` string.
///
/// Anchored at both ends: leading or trailing characters of any kind yield
/// `None`. Out-of-range parts roll over as in [`parts_to_date`].
pub fn string_to_date(s: &str) -> Option<Date> {
    let captures = consts::DATE_REGEX.captures(s)?;
    parts_to_date(&captures[1], &captures[2], &captures[3])
}
