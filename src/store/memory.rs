//! In-memory tree store.
//!
//! Holds the whole tree in one `serde_json::Value`. Used by tests and by the
//! CLI's `memory` backend.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{StoreResult, TreeStore};
use super::path;

/// In-memory tree store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `root`.
    #[must_use]
    pub fn with_root(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Returns a copy of the whole tree.
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let root = self.root.read().await;
        let value = path::get_at(&root, &path::segments(path))
            .filter(|v| !v.is_null())
            .cloned();
        debug!("memory read {path}: {}", if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn write(&self, path: &str, value: Option<Value>) -> StoreResult<()> {
        let mut root = self.root.write().await;
        let segments = path::segments(path);
        match value.filter(|v| !v.is_null()) {
            Some(value) => path::set_at(&mut root, &segments, value),
            None => path::remove_at(&mut root, &segments),
        }
        debug!("memory write {path}");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store
            .write("/users/a", Some(json!({"status": "ok"})))
            .await
            .expect("write failed");

        let value = store.read("/users/a/status").await.expect("read failed");
        assert_eq!(value, Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_null_is_absent() {
        let store = MemoryStore::with_root(json!({"a": 1}));
        store.write("/a", Some(Value::Null)).await.expect("write failed");

        assert_eq!(store.read("/a").await.expect("read failed"), None);
        assert_eq!(store.snapshot().await, json!({}));
    }

    #[tokio::test]
    async fn test_delete_root() {
        let store = MemoryStore::with_root(json!({"a": 1}));
        store.write("/", None).await.expect("write failed");
        assert_eq!(store.read("/").await.expect("read failed"), None);
    }
}
