//! Store operations that feed a recording session.
//!
//! Call sites hand the editor an explicit [`RecordingSession`]; every
//! successful operation is captured there (an inactive session ignores it).

use serde_json::Value;
use tracing::info;

use crate::diff::parse_user_value;
use crate::error::{Result, ValidationError};
use crate::recording::RecordingSession;

use super::backend::TreeStore;
use super::path;

/// Performs store CRUD and records what it did.
#[derive(Debug)]
pub struct TreeEditor<'a, S: TreeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TreeStore + ?Sized> TreeEditor<'a, S> {
    /// Creates an editor over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reads a value and records the read.
    ///
    /// # Errors
    ///
    /// Returns a store error if the read fails.
    pub async fn get(&self, session: &mut RecordingSession, key: &str) -> Result<Option<Value>> {
        let key = normalize(key)?;
        let value = self.store.read(&key).await?;
        session.record_get(&key);
        Ok(value)
    }

    /// Parses `text` as JSON, writes it, and records the edit.
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid JSON (nothing is written) and a
    /// store error if the write fails.
    pub async fn set_json(
        &self,
        session: &mut RecordingSession,
        key: &str,
        text: &str,
    ) -> Result<()> {
        let value = parse_user_value(text)?;
        self.set(session, key, value).await
    }

    /// Writes a value and records the edit.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    pub async fn set(&self, session: &mut RecordingSession, key: &str, value: Value) -> Result<()> {
        let key = normalize(key)?;
        self.store.write(&key, Some(value.clone())).await?;
        info!("Set {key}");
        session.record_edit(&key, &value);
        Ok(())
    }

    /// Removes a value and records the delete.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    pub async fn delete(&self, session: &mut RecordingSession, key: &str) -> Result<()> {
        let key = normalize(key)?;
        self.store.write(&key, None).await?;
        info!("Deleted {key}");
        session.record_delete(&key);
        Ok(())
    }
}

/// Canonicalizes an operator-supplied path.
fn normalize(key: &str) -> std::result::Result<String, ValidationError> {
    if key.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidPath {
            path: key.to_string(),
            message: String::from("paths may not contain whitespace"),
        });
    }
    Ok(path::from_segments(&path::segments(key)))
}
