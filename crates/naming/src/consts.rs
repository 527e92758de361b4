use regex::Regex;
use std::sync::LazyLock;

// ASCII-only classes: `\d` and `\w` are Unicode-aware in the regex crate.
const DIGIT: &str = "[0-9]";
const WORD: &str = "[A-Za-z0-9_]";
const NAME: &str = "[A-Za-z0-9_-]";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(
    FILENAME_REGEX,
    format!(
        r"^(?P<year>{DIGIT}{{4}})-(?P<month>{DIGIT}{{2}})-(?P<day>{DIGIT}{{2}})-(?P<full>(?P<base>{NAME}+)_{DIGIT}+|{NAME}+)\.(?P<ext>{WORD}+)$"
    )
    .as_str()
);
regex!(DATE_REGEX, format!(r"^({DIGIT}{{4}})-({DIGIT}{{2}})-({DIGIT}{{2}})$").as_str());

/// Separator between a dataset name and its version suffix.
pub(crate) const VERSION_SEPARATOR: char = '_';
/// Pattern used for the date token of canonical filenames.
pub(crate) const SORTABLE_DATE: &str = "YYYY-MM-DD";
/// Pattern used for the timestamp token of JSON log artifacts.
pub(crate) const TIMESTAMP: &str = "YYYYMMDDHHmmss";
