//! JSON file-backed tree store.
//!
//! This module keeps the whole tree in a single JSON document on disk, for
//! local experimentation and for replaying recordings against a scratch copy
//! of real data.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;

use super::backend::{StoreResult, TreeStore};
use super::path;

/// JSON file-backed tree store.
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path to the JSON document.
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store over the given file. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole tree; a missing file is an empty tree.
    async fn load_root(&self) -> StoreResult<Value> {
        if !self.path.exists() {
            debug!("Store file does not exist: {}", self.path.display());
            return Ok(Value::Null);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            StoreError::transport(path::ROOT, format!("Failed to read store file: {e}"))
        })?;

        if content.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::corrupted(format!("Failed to parse store file: {e}")))
    }

    /// Persists the whole tree through a temp file and an atomic rename.
    async fn save_root(&self, root: &Value) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::transport(path::ROOT, format!("Failed to create store directory: {e}"))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(root)
            .map_err(|e| StoreError::corrupted(format!("Failed to serialize store: {e}")))?;

        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StoreError::transport(path::ROOT, format!("Failed to create temp store file: {e}"))
        })?;

        file.write_all(content.as_bytes()).await.map_err(|e| {
            StoreError::transport(path::ROOT, format!("Failed to write store file: {e}"))
        })?;

        file.sync_all().await.map_err(|e| {
            StoreError::transport(path::ROOT, format!("Failed to sync store file: {e}"))
        })?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            StoreError::transport(path::ROOT, format!("Failed to rename store file: {e}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl TreeStore for JsonFileStore {
    async fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        let _lock = self.guard.lock().await;
        let root = self.load_root().await?;
        Ok(path::get_at(&root, &path::segments(key))
            .filter(|v| !v.is_null())
            .cloned())
    }

    async fn write(&self, key: &str, value: Option<Value>) -> StoreResult<()> {
        let _lock = self.guard.lock().await;
        let mut root = self.load_root().await?;
        let segments = path::segments(key);

        match value.filter(|v| !v.is_null()) {
            Some(value) => path::set_at(&mut root, &segments, value),
            None => path::remove_at(&mut root, &segments),
        }

        info!("Writing {key} to {}", self.path.display());
        self.save_root(&root).await
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
