//! Structural diff between two tree snapshots.
//!
//! Mappings are compared key by key; sequences are compared as mappings from
//! stringified index, so reordering a sequence shows up as an edit of every
//! shifted element.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::store::path;

/// Label used for a change rooted at the diff base.
pub const ROOT_LABEL: &str = "<root>";

/// Engine for computing structural differences.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Kind of change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Key present only in the modified tree.
    Create,
    /// Key present only in the original tree.
    Delete,
    /// Key present in both with different values.
    Edit,
}

/// One difference between two trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffChange {
    /// Kind of change.
    pub kind: DiffKind,
    /// Key chain from the diff root.
    pub path: Vec<String>,
    /// Value before the change; absent for creates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    /// Value after the change; absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    /// Reviewer selection; only selected changes are applied.
    #[serde(default = "default_selected")]
    pub selected: bool,
}

const fn default_selected() -> bool {
    true
}

/// Children of a container node, keyed by mapping key or stringified index.
enum Children<'a> {
    Mapping(&'a serde_json::Map<String, Value>),
    Sequence(&'a [Value]),
}

impl<'a> Children<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Mapping(map)),
            Value::Array(items) => Some(Self::Sequence(items)),
            _ => None,
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Mapping(_), Self::Mapping(_)) | (Self::Sequence(_), Self::Sequence(_))
        )
    }

    fn keys(&self) -> Vec<String> {
        match self {
            Self::Mapping(map) => map.keys().cloned().collect(),
            Self::Sequence(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        match self {
            Self::Mapping(map) => map.get(key),
            Self::Sequence(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        }
    }
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the changes that turn `original` into `modified`.
    ///
    /// Paths in the result start with `base_path`. Emission order follows
    /// sorted key order but callers should only rely on the set of changes.
    #[must_use]
    pub fn diff(&self, original: &Value, modified: &Value, base_path: &[String]) -> Vec<DiffChange> {
        let mut changes = Vec::new();
        let mut path = base_path.to_vec();
        Self::diff_into(original, modified, &mut path, &mut changes);
        debug!("Diff produced {} changes", changes.len());
        changes
    }

    /// Applies `changes` to `tree` in memory.
    ///
    /// Creates and edits are written first in the given order. Deletes follow
    /// with later sequence indices first, so a shrunk sequence is popped from
    /// the tail and nulls written by an edit survive.
    pub fn apply_changes<'a>(tree: &mut Value, changes: impl IntoIterator<Item = &'a DiffChange>) {
        let mut deletes = Vec::new();
        for change in changes {
            match &change.new_value {
                Some(value) => path::set_at(tree, &change.path, value.clone()),
                None => deletes.push(change.path.as_slice()),
            }
        }
        deletes.sort_by(|a, b| path::cmp_removal_order(*a, *b));
        for segments in deletes {
            path::remove_at(tree, segments);
        }
    }

    fn diff_into(
        original: &Value,
        modified: &Value,
        path: &mut Vec<String>,
        changes: &mut Vec<DiffChange>,
    ) {
        let containers = Children::of(original).zip(Children::of(modified));
        let (before, after) = match containers {
            Some((before, after)) if before.same_kind(&after) => (before, after),
            _ => {
                if original != modified {
                    changes.push(DiffChange::edit(path.clone(), original.clone(), modified.clone()));
                }
                return;
            }
        };

        let keys: BTreeSet<String> = before.keys().into_iter().chain(after.keys()).collect();

        for key in keys {
            match (before.get(&key), after.get(&key)) {
                (None, Some(new)) => {
                    changes.push(DiffChange::create(child_path(path, &key), new.clone()));
                }
                (Some(old), None) => {
                    changes.push(DiffChange::delete(child_path(path, &key), old.clone()));
                }
                (Some(old), Some(new)) if old != new => {
                    path.push(key);
                    Self::diff_into(old, new, path, changes);
                    path.pop();
                }
                _ => {}
            }
        }
    }
}

fn child_path(path: &[String], key: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(key.to_string());
    child
}

impl DiffChange {
    /// Creates a create change.
    #[must_use]
    pub fn create(path: Vec<String>, new_value: Value) -> Self {
        Self {
            kind: DiffKind::Create,
            path,
            old_value: None,
            new_value: Some(new_value),
            selected: true,
        }
    }

    /// Creates a delete change.
    #[must_use]
    pub fn delete(path: Vec<String>, old_value: Value) -> Self {
        Self {
            kind: DiffKind::Delete,
            path,
            old_value: Some(old_value),
            new_value: None,
            selected: true,
        }
    }

    /// Creates an edit change.
    #[must_use]
    pub fn edit(path: Vec<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            kind: DiffKind::Edit,
            path,
            old_value: Some(old_value),
            new_value: Some(new_value),
            selected: true,
        }
    }

    /// Last path segment, or [`ROOT_LABEL`] for a change at the diff root.
    #[must_use]
    pub fn label(&self) -> &str {
        self.path.last().map_or(ROOT_LABEL, String::as_str)
    }

    /// Slash-separated rendering of the path.
    #[must_use]
    pub fn path_string(&self) -> String {
        path::from_segments(&self.path)
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Edit => "edit",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for DiffChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn change_set(changes: &[DiffChange]) -> HashSet<(DiffKind, String, String, String)> {
        changes
            .iter()
            .map(|c| {
                (
                    c.kind,
                    c.path_string(),
                    c.old_value.as_ref().map(ToString::to_string).unwrap_or_default(),
                    c.new_value.as_ref().map(ToString::to_string).unwrap_or_default(),
                )
            })
            .collect()
    }

    fn apply_all(original: &Value, changes: &[DiffChange]) -> Value {
        let mut tree = original.clone();
        DiffEngine::apply_changes(&mut tree, changes);
        tree
    }

    #[test]
    fn test_identical_trees_have_no_changes() {
        let tree = json!({"a": {"b": [1, 2, {"c": null}]}, "d": "x"});
        assert!(DiffEngine::new().diff(&tree, &tree, &[]).is_empty());
    }

    #[test]
    fn test_create_delete_edit() {
        let original = json!({"keep": 1, "gone": {"x": 1}, "changed": "a", "nested": {"v": 1}});
        let modified = json!({"keep": 1, "added": [1], "changed": "b", "nested": {"v": 2}});

        let changes = DiffEngine::new().diff(&original, &modified, &[]);
        let expected: HashSet<_> = [
            (DiffKind::Create, "/added".to_string(), String::new(), "[1]".to_string()),
            (DiffKind::Delete, "/gone".to_string(), "{\"x\":1}".to_string(), String::new()),
            (DiffKind::Edit, "/changed".to_string(), "\"a\"".to_string(), "\"b\"".to_string()),
            (DiffKind::Edit, "/nested/v".to_string(), "1".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(change_set(&changes), expected);
    }

    #[test]
    fn test_scalar_roots_yield_root_edit() {
        let changes = DiffEngine::new().diff(&json!(1), &json!(2), &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].label(), ROOT_LABEL);
        assert!(changes[0].path.is_empty());

        let base = vec!["config".to_string(), "retries".to_string()];
        let changes = DiffEngine::new().diff(&Value::Null, &json!(3), &base);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, DiffKind::Edit);
        assert_eq!(changes[0].label(), "retries");
        assert_eq!(changes[0].path, base);
    }

    #[test]
    fn test_mapping_versus_scalar_is_single_edit() {
        let changes = DiffEngine::new().diff(&json!({"a": {"b": 1}}), &json!({"a": 5}), &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, DiffKind::Edit);
        assert_eq!(changes[0].path_string(), "/a");
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let a: Value = serde_json::from_str(r#"{"x": {"p": 1, "q": 2}, "y": 3}"#).expect("json");
        let b: Value = serde_json::from_str(r#"{"y": 3, "x": {"q": 2, "p": 1}}"#).expect("json");
        assert!(DiffEngine::new().diff(&a, &b, &[]).is_empty());

        let c: Value = serde_json::from_str(r#"{"y": 4, "x": {"q": 2, "p": 0}}"#).expect("json");
        let from_a = change_set(&DiffEngine::new().diff(&a, &c, &[]));
        let from_b = change_set(&DiffEngine::new().diff(&b, &c, &[]));
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn test_sequences_diff_positionally() {
        let changes = DiffEngine::new().diff(&json!({"l": [1, 2, 3]}), &json!({"l": [2, 3]}), &[]);
        let kinds: HashSet<_> = changes.iter().map(|c| (c.kind, c.path_string())).collect();
        assert_eq!(
            kinds,
            [
                (DiffKind::Edit, "/l/0".to_string()),
                (DiffKind::Edit, "/l/1".to_string()),
                (DiffKind::Delete, "/l/2".to_string()),
            ]
            .into_iter()
            .collect()
        );
    }

    #[test]
    fn test_sequence_versus_mapping_is_edit() {
        let changes = DiffEngine::new().diff(&json!([1, 2]), &json!({"0": 1, "1": 2}), &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, DiffKind::Edit);
    }

    #[test]
    fn test_applying_changes_reproduces_target() {
        let cases = [
            (json!({}), json!({"a": 1})),
            (json!({"a": 1}), json!({})),
            (json!({"a": {"b": 1, "c": [1, 2, 3]}}), json!({"a": {"b": 2, "c": [1, 5]}, "d": true})),
            (json!({"l": [1, 2]}), json!({"l": [1, 2, 3, 4]})),
            (json!({"a": {"x": 1}}), json!({"a": {}})),
            (json!({"a": {"x": 1}}), json!({"a": "flat"})),
            (json!([1, {"k": "v"}]), json!({"0": 1})),
            (json!(null), json!({"fresh": {"tree": [true]}})),
            (json!({"a": null}), json!({})),
            (json!({"l": [1, 2, 3]}), json!({"l": [1, null]})),
            (json!({"l": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]}), json!({"l": [0, 1]})),
            (json!({"l": [1, 2, 3]}), json!({"l": [null, null]})),
        ];

        for (original, modified) in cases {
            let changes = DiffEngine::new().diff(&original, &modified, &[]);
            assert_eq!(apply_all(&original, &changes), modified, "from {original} to {modified}");
        }
    }

    #[test]
    fn test_deterministic_set() {
        let a = json!({"u": {"1": {"s": "a"}, "2": {"s": "b"}}, "v": [1, 2]});
        let b = json!({"u": {"1": {"s": "c"}, "3": {"s": "b"}}, "v": [2]});
        let first = change_set(&DiffEngine::new().diff(&a, &b, &[]));
        for _ in 0..5 {
            assert_eq!(change_set(&DiffEngine::new().diff(&a, &b, &[])), first);
        }
    }
}
