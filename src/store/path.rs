//! Slash-separated store paths and in-memory tree mutation.
//!
//! Every backend and the diff applier route mutations through the helpers in
//! this module so that a value written through a store and a value produced by
//! applying a diff in memory end up with the same shape.

use serde_json::{Map, Value};

/// Path of the tree root.
pub const ROOT: &str = "/";

/// Largest gap a numeric write may open past the end of a sequence before the
/// sequence is converted into a mapping instead of padded with nulls.
const MAX_SEQUENCE_GAP: usize = 1024;

/// Splits a path into its non-empty segments.
#[must_use]
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Builds a path from segments.
#[must_use]
pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(seg.as_ref());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Appends `key` to `base` with exactly one separator.
#[must_use]
pub fn join(base: &str, key: &str) -> String {
    let base = base.trim_end_matches('/');
    let key = key.trim_start_matches('/');
    format!("{base}/{key}")
}

/// Resolves `key` against `base`: absolute keys are kept, relative keys are
/// appended to `base`.
#[must_use]
pub fn resolve(base: &str, key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    } else {
        join(base, key)
    }
}

/// Returns the node at `segments`, if any.
#[must_use]
pub fn get_at<'a, S: AsRef<str>>(root: &'a Value, segments: &[S]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segments {
        node = child(node, seg.as_ref())?;
    }
    Some(node)
}

/// Writes `value` at `segments`, creating intermediate mappings.
///
/// Scalars in the way are replaced by mappings. A numeric segment indexes into
/// a sequence (padding with nulls); any other segment turns a sequence into a
/// mapping keyed by stringified index.
pub fn set_at<S: AsRef<str>>(root: &mut Value, segments: &[S], value: Value) {
    let mut node = root;
    for seg in segments {
        node = child_mut(node, seg.as_ref());
    }
    *node = value;
}

/// Removes the node at `segments`.
///
/// Removing the last element of a sequence shortens it; removing any other
/// element nulls it so the indices after it keep their meaning. Removing the
/// root leaves `null`. Missing paths are ignored.
pub fn remove_at<S: AsRef<str>>(root: &mut Value, segments: &[S]) {
    let Some((last, parents)) = segments.split_last() else {
        *root = Value::Null;
        return;
    };

    let mut node = root;
    for seg in parents {
        node = match lookup_mut(node, seg.as_ref()) {
            Some(next) => next,
            None => return,
        };
    }

    match node {
        Value::Object(map) => {
            map.remove(last.as_ref());
        }
        Value::Array(items) => match parse_index(last.as_ref()) {
            Some(i) if i + 1 == items.len() => {
                items.pop();
            }
            Some(i) if i < items.len() => items[i] = Value::Null,
            _ => {}
        },
        _ => {}
    }
}

/// Orders two paths so that later sequence indices come first.
///
/// Segments that both parse as indices compare numerically; any other pair
/// compares as strings. Removing paths in this order shortens sequences from
/// the tail.
#[must_use]
pub fn cmp_removal_order<S: AsRef<str>>(a: &[S], b: &[S]) -> std::cmp::Ordering {
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x.as_ref(), y.as_ref());
        let ord = match (parse_index(x), parse_index(y)) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => x.cmp(y),
        };
        if ord.is_ne() {
            return ord.reverse();
        }
    }
    b.len().cmp(&a.len())
}

/// Parses a sequence index segment.
fn parse_index(seg: &str) -> Option<usize> {
    seg.parse::<usize>().ok()
}

fn child<'a>(node: &'a Value, seg: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => parse_index(seg).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn lookup_mut<'a>(node: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => parse_index(seg).and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, seg: &str) -> &'a mut Value {
    let index = parse_index(seg);
    let indexable = match &*node {
        Value::Object(_) => true,
        Value::Array(items) => index.is_some_and(|i| i <= items.len() + MAX_SEQUENCE_GAP),
        _ => false,
    };
    if !indexable {
        *node = into_mapping(std::mem::take(node));
    }

    match node {
        Value::Array(items) => {
            let idx = index.unwrap_or(items.len());
            if idx >= items.len() {
                items.resize(idx + 1, Value::Null);
            }
            &mut items[idx]
        }
        Value::Object(map) => map.entry(seg.to_owned()).or_insert(Value::Null),
        scalar => {
            *scalar = Value::Object(Map::new());
            child_mut(scalar, seg)
        }
    }
}

fn into_mapping(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Object(
            items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segments_and_from_segments() {
        assert_eq!(segments("/users//a/"), vec!["users", "a"]);
        assert!(segments("/").is_empty());
        assert_eq!(from_segments(&["users", "a"]), "/users/a");
        assert_eq!(from_segments::<&str>(&[]), "/");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(resolve("/users", "a"), "/users/a");
        assert_eq!(resolve("/users/", "a/b"), "/users/a/b");
        assert_eq!(resolve("/users", "/archive/a"), "/archive/a");
        assert_eq!(resolve("/", "a"), "/a");
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut root = json!({"a": 1});
        set_at(&mut root, &["a", "b", "c"], json!(true));
        assert_eq!(root, json!({"a": {"b": {"c": true}}}));
    }

    #[test]
    fn test_set_into_sequence_pads_with_nulls() {
        let mut root = json!({"list": [1]});
        set_at(&mut root, &["list", "3"], json!(4));
        assert_eq!(root, json!({"list": [1, null, null, 4]}));
    }

    #[test]
    fn test_set_non_numeric_key_converts_sequence() {
        let mut root = json!([1, 2]);
        set_at(&mut root, &["name"], json!("x"));
        assert_eq!(root, json!({"0": 1, "1": 2, "name": "x"}));
    }

    #[test]
    fn test_remove_from_sequence() {
        let mut root = json!([1, 2, 3, 4]);
        remove_at(&mut root, &["3"]);
        remove_at(&mut root, &["2"]);
        assert_eq!(root, json!([1, 2]));

        remove_at(&mut root, &["0"]);
        assert_eq!(root, json!([null, 2]));

        remove_at(&mut root, &["9"]);
        assert_eq!(root, json!([null, 2]));
    }

    #[test]
    fn test_remove_last_keeps_written_nulls() {
        let mut root = json!([1, 2, 3]);
        set_at(&mut root, &["1"], Value::Null);
        remove_at(&mut root, &["2"]);
        assert_eq!(root, json!([1, null]));
    }

    #[test]
    fn test_removal_order_is_numeric_and_descending() {
        let mut paths = vec![vec!["l", "2"], vec!["l", "10"], vec!["a"], vec!["l", "9"]];
        paths.sort_by(|a, b| cmp_removal_order(a.as_slice(), b.as_slice()));
        assert_eq!(paths, vec![vec!["l", "10"], vec!["l", "9"], vec!["l", "2"], vec!["a"]]);
    }

    #[test]
    fn test_remove_keeps_empty_parents() {
        let mut root = json!({"a": {"b": 1}});
        remove_at(&mut root, &["a", "b"]);
        assert_eq!(root, json!({"a": {}}));

        remove_at(&mut root, &["missing", "x"]);
        assert_eq!(root, json!({"a": {}}));

        remove_at::<&str>(&mut root, &[]);
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn test_get_at() {
        let root = json!({"a": [{"b": 7}]});
        assert_eq!(get_at(&root, &["a", "0", "b"]), Some(&json!(7)));
        assert_eq!(get_at(&root, &["a", "1"]), None);
        assert_eq!(get_at::<&str>(&root, &[]), Some(&root));
    }
}
