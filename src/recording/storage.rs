//! File persistence for recordings and diff dumps.
//!
//! Recordings are stored in the text format from [`super::codec`]; diff review
//! dumps are plain pretty-printed JSON.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, TreeplayError};

use super::action::RecordingFile;
use super::codec;

/// Loads and saves recording files and JSON dumps.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    /// Base directory for relative names.
    base_dir: Option<PathBuf>,
}

impl RecordingStorage {
    /// Creates storage that resolves names against the working directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_dir: None }
    }

    /// Creates storage rooted at `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Resolves a file name against the base directory.
    #[must_use]
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        match &self.base_dir {
            Some(base) if name.is_relative() => base.join(name),
            _ => name.to_path_buf(),
        }
    }

    /// Returns true if the named file exists.
    #[must_use]
    pub fn exists(&self, name: impl AsRef<Path>) -> bool {
        self.resolve(name).exists()
    }

    /// Loads a recording.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read and a format error if
    /// its contents do not parse.
    pub async fn load(&self, name: impl AsRef<Path>) -> Result<RecordingFile> {
        let path = self.resolve(name);
        info!("Loading recording from: {}", path.display());
        let text = fs::read_to_string(&path).await?;
        Ok(codec::decode(&text)?)
    }

    /// Saves a recording.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub async fn save(&self, name: impl AsRef<Path>, file: &RecordingFile) -> Result<()> {
        let path = self.resolve(name);
        info!("Saving recording ({} actions) to: {}", file.actions.len(), path.display());
        Self::write_text(&path, &codec::encode(file)).await
    }

    /// Writes a pretty-printed JSON dump.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub async fn write_json(&self, name: impl AsRef<Path>, value: &Value) -> Result<()> {
        let path = self.resolve(name);
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| TreeplayError::internal(format!("Failed to serialize dump: {e}")))?;
        info!("Writing JSON dump to: {}", path.display());
        Self::write_text(&path, &text).await
    }

    /// Reads a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the file is not valid JSON.
    pub async fn read_json(&self, name: impl AsRef<Path>) -> Result<Value> {
        let path = self.resolve(name);
        let text = fs::read_to_string(&path).await?;
        Ok(crate::diff::parse_user_value(&text)?)
    }

    /// Writes through a temp file and renames into place.
    async fn write_text(path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(text.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, path).await?;

        debug!("Wrote {} bytes to {}", text.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{ActionHeader, RecordedAction};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_storage() -> (RecordingStorage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = RecordingStorage::with_base_dir(temp_dir.path());
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (storage, _temp) = create_test_storage();
        let file = RecordingFile::new(
            ActionHeader::default(),
            vec![RecordedAction::edit("/a", json!([1, 2])), RecordedAction::get("/a")],
        );

        storage.save("session.rec", &file).await.expect("save failed");
        assert!(storage.exists("session.rec"));

        let loaded = storage.load("session.rec").await.expect("load failed");
        assert_eq!(loaded, file);
    }

    #[tokio::test]
    async fn test_load_reports_format_error() {
        let (storage, temp) = create_test_storage();
        std::fs::write(temp.path().join("bad.rec"), "bogus 1\n").expect("write failed");

        let err = storage.load("bad.rec").await.expect_err("load should fail");
        assert!(matches!(err, TreeplayError::Format(_)));
    }

    #[tokio::test]
    async fn test_json_dump_round_trip() {
        let (storage, _temp) = create_test_storage();
        let value = json!({"changes": [{"kind": "create"}]});

        storage.write_json("dumps/review.json", &value).await.expect("write failed");
        let read = storage.read_json("dumps/review.json").await.expect("read failed");
        assert_eq!(read, value);
    }
}
