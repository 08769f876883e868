use std::cmp::Ordering;

use serde_json::{Map, Value};

/// Compare two child keys in source order.
///
/// Keys that are canonical 32-bit integers come first, ordered numerically;
/// all other keys follow in lexicographic order.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use storebind_mock::child_key_cmp;
///
/// assert_eq!(child_key_cmp("2", "10"), Ordering::Less);
/// assert_eq!(child_key_cmp("10", "a"), Ordering::Less);
/// assert_eq!(child_key_cmp("bar", "foo"), Ordering::Less);
/// ```
pub fn child_key_cmp(a: &str, b: &str) -> Ordering {
    match (as_index(a), as_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_index(key: &str) -> Option<i32> {
    let n: i32 = key.parse().ok()?;
    (n.to_string() == key).then_some(n)
}

/// Children of `value` in source order; empty for non-objects.
pub fn sorted_children(value: Option<&Value>) -> Vec<(String, Value)> {
    let mut out: Vec<(String, Value)> = match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => Vec::new(),
    };
    out.sort_by(|(a, _), (b, _)| child_key_cmp(a, b));
    out
}

pub(crate) fn sort_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| child_key_cmp(a, b));
    entries.into_iter().collect()
}
