//! Diff review: selecting changes and applying them to a store.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{Result, StoreError, ValidationError};
use crate::store::{TreeStore, path};

use super::engine::{DiffChange, DiffEngine, DiffKind};

/// A computed diff awaiting review.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReview {
    /// Store path the diff is rooted at.
    pub base_path: String,
    /// Changes relative to `base_path`.
    pub changes: Vec<DiffChange>,
}

/// Outcome of applying a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Number of changes written.
    pub applied: usize,
    /// Number of deselected changes left out.
    pub skipped: usize,
}

/// Parses operator-supplied JSON for an edit or add.
///
/// Unlike recording text, invalid input is rejected rather than turned into a
/// string.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidJson`] if `text` is not valid JSON.
pub fn parse_user_value(text: &str) -> std::result::Result<Value, ValidationError> {
    serde_json::from_str(text).map_err(|e| ValidationError::InvalidJson {
        message: e.to_string(),
    })
}

impl DiffReview {
    /// Diffs two snapshots of the subtree at `base_path`.
    #[must_use]
    pub fn compute(base_path: &str, original: &Value, modified: &Value) -> Self {
        Self {
            base_path: path::from_segments(&path::segments(base_path)),
            changes: DiffEngine::new().diff(original, modified, &[]),
        }
    }

    /// Returns true if there are no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Flips the selection of one change and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ChangeIndex`] for an out-of-range index.
    pub fn toggle(&mut self, index: usize) -> std::result::Result<bool, ValidationError> {
        let len = self.changes.len();
        let change = self
            .changes
            .get_mut(index)
            .ok_or(ValidationError::ChangeIndex { index, len })?;
        change.selected = !change.selected;
        Ok(change.selected)
    }

    /// Selects every change.
    pub fn select_all(&mut self) {
        self.changes.iter_mut().for_each(|c| c.selected = true);
    }

    /// Deselects every change.
    pub fn deselect_all(&mut self) {
        self.changes.iter_mut().for_each(|c| c.selected = false);
    }

    /// Returns the selected changes.
    pub fn selected(&self) -> impl Iterator<Item = &DiffChange> {
        self.changes.iter().filter(|c| c.selected)
    }

    /// Counts changes of one kind.
    #[must_use]
    pub fn count(&self, kind: DiffKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    /// Applies the selected changes to `store`.
    ///
    /// The current subtree at `base_path` is read, every selected change is
    /// applied to it in memory, and the result is written back with a single
    /// write. A failed read writes nothing.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] from the read or the write.
    pub async fn apply<S: TreeStore + ?Sized>(&self, store: &S) -> Result<ApplyReport> {
        let selected: Vec<&DiffChange> = self.selected().collect();
        let report = ApplyReport {
            applied: selected.len(),
            skipped: self.changes.len() - selected.len(),
        };

        if selected.is_empty() {
            info!("No selected changes to apply at {}", self.base_path);
            return Ok(report);
        }

        let mut subtree = store
            .read(&self.base_path)
            .await
            .map_err(|e| log_abort(&self.base_path, e))?
            .unwrap_or(Value::Null);

        DiffEngine::apply_changes(&mut subtree, selected);

        store
            .write(&self.base_path, Some(subtree))
            .await
            .map_err(|e| log_abort(&self.base_path, e))?;

        info!(
            "Applied {} changes at {} ({} skipped)",
            report.applied, self.base_path, report.skipped
        );
        Ok(report)
    }

    /// Plain JSON dump of the review for export.
    #[must_use]
    pub fn export_json(&self) -> Value {
        serde_json::json!({
            "base_path": self.base_path,
            "creates": self.count(DiffKind::Create),
            "deletes": self.count(DiffKind::Delete),
            "edits": self.count(DiffKind::Edit),
            "changes": self.changes,
        })
    }
}

fn log_abort(base_path: &str, e: StoreError) -> StoreError {
    error!("Aborting apply at {base_path}: {e}");
    e
}
