use crate::consts::VERSION_SEPARATOR;

/// Splits a composite ID on `_` and assigns each numeric segment to the key
/// at the same position.
///
/// Segments beyond the end of `keys` are ignored, and so are segments that
/// aren't numbers: the returned list only holds the keys that got a value,
/// in key order.
///
/// ```
/// use dataname_naming::split::split_id_by_keys;
///
/// let slices = split_id_by_keys("12_7_2024", &["store", "till", "year"]);
/// assert_eq!(slices, vec![("store", 12), ("till", 7), ("year", 2024)]);
/// ```
pub fn split_id_by_keys<'k>(id: &str, keys: &[&'k str]) -> Vec<(&'k str, i64)> {
    id.split(VERSION_SEPARATOR)
        .zip(keys)
        .filter_map(|(value, key)| value.parse::<i64>().ok().map(|value| (*key, value)))
        .collect()
}
