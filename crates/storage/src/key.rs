//! Object key validation.
//!
//! Keys are `/`-separated strings relative to a backend's root, the same on
//! every platform. Validation normalizes them so that the local filesystem
//! and S3 agree on what a key means, and refuses keys that escape the root.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes an object key.
///
/// Empty and `.` segments are dropped, `..` removes the preceding segment,
/// and trailing slashes are stripped. Keys that would leave the root, that
/// contain null bytes or backslashes, or that normalize to nothing are
/// rejected with [`InvalidKey`](crate::error::ErrorKind::InvalidKey).
///
/// # Examples
///
/// ```
/// use dataname_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("imports/2024-05-01-sales.csv").is_ok());
/// assert!(validate_key("a/../2024-05-01-sales.csv").is_ok()); // (never leaves root)
/// // Invalid keys
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(validate_key("wrong/../imports//./sales.csv/").unwrap(), "imports/sales.csv");
/// ```
pub fn validate(key: &str) -> Result<String> {
    if key.contains(['\0', '\\']) {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}

/// Validates a listing prefix.
///
/// Prefixes are matched as plain string prefixes, the way object stores
/// match them, so a trailing `/` is significant (`imports/` doesn't match
/// `imports-old/a.csv`, `imports` does) and is preserved. An empty prefix
/// means "everything" and yields `None`.
pub fn validate_prefix(prefix: &str) -> Result<Option<String>> {
    if prefix.is_empty() {
        return Ok(None);
    }
    let mut validated = validate(prefix)?;
    if prefix.ends_with('/') {
        validated.push('/');
    }
    Ok(Some(validated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("imports/2024-05-01-sales.csv", "imports/2024-05-01-sales.csv")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("/leading/slash.csv", "leading/slash.csv")]
    #[case("a/b/..", "a")]
    #[case("imports///", "imports")]
    fn test_valid_keys(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(validate(key).unwrap(), expected);
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("a\0b")]
    #[case("a\\b")]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    fn test_invalid_keys(#[case] key: &str) {
        let err = validate(key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[rstest]
    #[case("", None)]
    #[case("imports/", Some("imports/"))]
    #[case("imports", Some("imports"))]
    #[case("imports//2024-05-01-sales", Some("imports/2024-05-01-sales"))]
    #[case("./imports/", Some("imports/"))]
    fn test_validate_prefix(#[case] prefix: &str, #[case] expected: Option<&str>) {
        assert_eq!(validate_prefix(prefix).unwrap().as_deref(), expected);
    }

    #[test]
    fn test_validate_prefix_rejects_traversal() {
        assert!(validate_prefix("../").is_err());
    }
}
