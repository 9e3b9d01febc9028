//! Exec expansion: turning one scripted action into concrete edits.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EvalError, StoreError};
use crate::recording::{ExecAction, RecordedAction};
use crate::store::{TreeStore, path};

use super::eval::{Bindings, evaluate, truthy};
use super::parser::{Expr, parse};

/// A parsed exec action, ready to run against child values.
#[derive(Debug, Clone)]
pub struct CompiledExec {
    path: String,
    target: Expr,
    action: Expr,
}

impl CompiledExec {
    /// Parses both expressions of `exec`.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvalError`] from either expression.
    pub fn compile(exec: &ExecAction) -> Result<Self, EvalError> {
        Ok(Self {
            path: path::from_segments(&path::segments(&exec.path)),
            target: parse(&exec.target_expr)?,
            action: parse(&exec.action_expr)?,
        })
    }

    /// Evaluates the predicate for one child. Errors count as false.
    #[must_use]
    pub fn matches(&self, key: &str, value: &Value) -> bool {
        match evaluate(&self.target, Bindings { key, value }) {
            Ok(result) => truthy(&result),
            Err(e) => {
                warn!("Predicate failed for {}/{key}: {e}", self.path);
                false
            }
        }
    }

    /// Evaluates the action expression for one child and interprets the result.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if evaluation fails or the result is not a
    /// `("DELETE", key)` or `("SET", key, value)` tuple.
    pub fn action_for(&self, key: &str, value: &Value) -> Result<RecordedAction, EvalError> {
        let result = evaluate(&self.action, Bindings { key, value })?;
        self.interpret(result)
    }

    fn interpret(&self, result: Value) -> Result<RecordedAction, EvalError> {
        if let Value::Array(items) = &result {
            match items.as_slice() {
                [Value::String(op), Value::String(key)] if op == "DELETE" => {
                    return Ok(RecordedAction::delete(path::resolve(&self.path, key)));
                }
                [Value::String(op), Value::String(key), value] if op == "SET" => {
                    return Ok(RecordedAction::edit(path::resolve(&self.path, key), value.clone()));
                }
                _ => {}
            }
        }
        Err(EvalError::UnexpectedShape {
            found: result.to_string(),
        })
    }

    /// Expands against the current value at the exec path.
    ///
    /// Children are visited in mapping order. Sequences are treated like
    /// mappings keyed by index, so their non-null elements are visited too,
    /// which goes beyond a mapping-only expansion. Anything other than a
    /// mapping or sequence yields nothing.
    #[must_use]
    pub fn expand_value(&self, current: Option<&Value>) -> Vec<RecordedAction> {
        let children: Vec<(String, &Value)> = match current {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => {
                debug!("Nothing to expand at {}", self.path);
                return Vec::new();
            }
        };

        let mut actions = Vec::new();
        for (key, value) in children {
            if !self.matches(&key, value) {
                continue;
            }
            match self.action_for(&key, value) {
                Ok(action) => actions.push(action),
                Err(e) => warn!("Dropping exec result for {}/{key}: {e}", self.path),
            }
        }
        actions
    }
}

/// Expands exec actions against a live store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecInterpreter;

impl ExecInterpreter {
    /// Creates an interpreter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Expands `exec` into edit/delete actions using the store's current data.
    ///
    /// Expressions that fail to parse yield an empty expansion.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] if the exec path cannot be read.
    pub async fn expand<S: TreeStore + ?Sized>(
        &self,
        store: &S,
        exec: &ExecAction,
    ) -> Result<Vec<RecordedAction>, StoreError> {
        let compiled = match CompiledExec::compile(exec) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!("Exec at {} does not parse: {e}", exec.path);
                return Ok(Vec::new());
            }
        };

        let current = store.read(&compiled.path).await?;
        let actions = compiled.expand_value(current.as_ref());
        debug!("Exec at {} expanded to {} action(s)", compiled.path, actions.len());
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn users_store() -> MemoryStore {
        MemoryStore::with_root(json!({
            "users": {
                "a": {"status": "stale"},
                "b": {"status": "ok"},
            }
        }))
    }

    #[tokio::test]
    async fn test_delete_stale_users() {
        let exec = ExecAction::new("/users", "value.status == \"stale\"", "(\"DELETE\", key)");
        let actions = ExecInterpreter::new()
            .expand(&users_store(), &exec)
            .await
            .expect("expand failed");
        assert_eq!(actions, vec![RecordedAction::delete("/users/a")]);
    }

    #[tokio::test]
    async fn test_set_with_absolute_and_relative_keys() {
        let exec = ExecAction::new("/users", "key == 'b'", "('SET', '/archive/' + key, value)");
        let actions = ExecInterpreter::new()
            .expand(&users_store(), &exec)
            .await
            .expect("expand failed");
        assert_eq!(actions, vec![RecordedAction::edit("/archive/b", json!({"status": "ok"}))]);

        let exec = ExecAction::new("/users", "true", "('SET', key + '/seen', 1)");
        let actions = ExecInterpreter::new()
            .expand(&users_store(), &exec)
            .await
            .expect("expand failed");
        assert_eq!(
            actions,
            vec![
                RecordedAction::edit("/users/a/seen", json!(1)),
                RecordedAction::edit("/users/b/seen", json!(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_or_scalar_path_expands_to_nothing() {
        let store = MemoryStore::with_root(json!({"flag": true}));
        let interpreter = ExecInterpreter::new();

        for path in ["/missing", "/flag"] {
            let exec = ExecAction::new(path, "true", "('DELETE', key)");
            let actions = interpreter.expand(&store, &exec).await.expect("expand failed");
            assert!(actions.is_empty(), "{path} should expand to nothing");
        }
    }

    #[tokio::test]
    async fn test_predicate_errors_are_swallowed_per_child() {
        // `value.status` on a number is a type error; only that child is skipped
        let store = MemoryStore::with_root(json!({
            "items": {"a": 5, "b": {"status": "stale"}, "c": {"status": "stale"}}
        }));
        let exec = ExecAction::new("/items", "value.status == 'stale'", "('DELETE', key)");
        let actions = ExecInterpreter::new()
            .expand(&store, &exec)
            .await
            .expect("expand failed");
        assert_eq!(
            actions,
            vec![RecordedAction::delete("/items/b"), RecordedAction::delete("/items/c")]
        );
    }

    #[tokio::test]
    async fn test_bad_action_shapes_are_dropped() {
        let store = users_store();
        let interpreter = ExecInterpreter::new();

        for action in [
            "('DROP', key)",
            "('DELETE', 5)",
            "('SET', key)",
            "key",
            "('DELETE', key, 1, 2)",
            "1 / 0",
        ] {
            let exec = ExecAction::new("/users", "true", action);
            let actions = interpreter.expand(&store, &exec).await.expect("expand failed");
            assert!(actions.is_empty(), "{action} should be dropped");
        }
    }

    #[tokio::test]
    async fn test_one_bad_child_does_not_block_batch() {
        let store = MemoryStore::with_root(json!({"n": {"a": 1, "b": "x", "c": 3}}));
        let exec = ExecAction::new("/n", "true", "('SET', key, value * 2)");
        let actions = ExecInterpreter::new()
            .expand(&store, &exec)
            .await
            .expect("expand failed");
        assert_eq!(
            actions,
            vec![
                RecordedAction::edit("/n/a", json!(2)),
                RecordedAction::edit("/n/c", json!(6)),
            ]
        );
    }

    #[test]
    fn test_sequence_children_use_index_keys() {
        let exec = ExecAction::new("/list", "value > 1", "('DELETE', key)");
        let compiled = CompiledExec::compile(&exec).expect("compile failed");
        let actions = compiled.expand_value(Some(&json!([1, 2, null, 3])));
        assert_eq!(
            actions,
            vec![RecordedAction::delete("/list/1"), RecordedAction::delete("/list/3")]
        );
    }

    #[test]
    fn test_compile_reports_syntax_errors() {
        let exec = ExecAction::new("/x", "value ==", "('DELETE', key)");
        assert!(matches!(
            CompiledExec::compile(&exec),
            Err(EvalError::Syntax { .. })
        ));
    }
}
