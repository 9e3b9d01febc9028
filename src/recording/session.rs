//! Recording session: the capture buffer bound to one editing session.
//!
//! A session is an explicit handle owned by whoever starts the recording and
//! passed by `&mut` to the code that performs store mutations.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::RecordingError;

use super::action::{ActionHeader, ExecAction, HeaderUpdate, RecordedAction, RecordingFile};
use super::codec;

/// Mutable capture buffer for store operations.
#[derive(Debug, Default)]
pub struct RecordingSession {
    header: ActionHeader,
    actions: Vec<RecordedAction>,
    active: bool,
}

impl RecordingSession {
    /// Creates an inactive session with a default header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reopens a persisted recording as an active session so more actions can
    /// be appended to it.
    #[must_use]
    pub fn resume(file: RecordingFile) -> Self {
        info!("Resuming recording with {} actions", file.actions.len());
        Self {
            header: file.header,
            actions: file.actions,
            active: true,
        }
    }

    /// Clears the buffer, resets the header to defaults, and starts capturing.
    pub fn start(&mut self) {
        self.actions.clear();
        self.header = ActionHeader::default();
        self.active = true;
        info!("Recording started");
    }

    /// Stops capturing and returns a snapshot of the header and buffer.
    pub fn stop(&mut self) -> RecordingFile {
        self.active = false;
        info!("Recording stopped with {} actions", self.actions.len());
        self.snapshot()
    }

    /// Updates header fields.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::HeaderLocked`] when the session is active
    /// and has already buffered an action.
    pub fn configure(&mut self, update: HeaderUpdate) -> Result<(), RecordingError> {
        if self.active && !self.actions.is_empty() {
            return Err(RecordingError::HeaderLocked {
                buffered: self.actions.len(),
            });
        }
        self.header.apply(update);
        debug!("Recording header now {:?}", self.header);
        Ok(())
    }

    /// Records an edit.
    pub fn record_edit(&mut self, key: &str, value: &Value) {
        self.push(RecordedAction::edit(key, value.clone()));
    }

    /// Records a delete.
    pub fn record_delete(&mut self, key: &str) {
        self.push(RecordedAction::delete(key));
    }

    /// Records a read.
    pub fn record_get(&mut self, key: &str) {
        self.push(RecordedAction::get(key));
    }

    /// Records a pause.
    pub fn record_sleep(&mut self, time_ms: u64) {
        self.push(RecordedAction::Sleep { time_ms });
    }

    /// Records a scripted bulk transformation.
    pub fn record_exec(&mut self, exec: ExecAction) {
        self.push(RecordedAction::Exec(exec));
    }

    /// Serializes the current header and buffer, active or not.
    #[must_use]
    pub fn export(&self) -> String {
        codec::encode(&self.snapshot())
    }

    /// Returns true while capturing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the current header.
    #[must_use]
    pub const fn header(&self) -> &ActionHeader {
        &self.header
    }

    /// Returns the buffered actions.
    #[must_use]
    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    fn snapshot(&self) -> RecordingFile {
        RecordingFile::new(self.header, self.actions.clone())
    }

    fn push(&mut self, action: RecordedAction) {
        if !self.active {
            return;
        }
        debug!("Recorded {action}");
        self.actions.push(action);
    }
}
