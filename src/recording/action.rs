//! Replayable action vocabulary.
//!
//! This module defines the recording header, the five action kinds, and the
//! recording file that bundles them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::codec;

/// Default pause after each executed action, in milliseconds.
pub const DEFAULT_AUTO_SLEEP_MS: u64 = 500;

/// Default watchdog timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// What playback does when it runs past the last action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Stop with `COMPLETED`.
    #[default]
    Normal,
    /// Start over from the first action.
    Loop,
}

/// Playback policy stored on the first line of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHeader {
    /// End-of-queue behavior.
    pub play_mode: PlayMode,
    /// Whether edits and deletes wait for operator confirmation.
    pub confirm_actions: bool,
    /// Pause after each executed action.
    pub auto_sleep_ms: u64,
    /// Watchdog timeout; zero disables it.
    pub timeout_seconds: u64,
}

/// Partial header update; `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderUpdate {
    /// New play mode.
    pub play_mode: Option<PlayMode>,
    /// New confirmation flag.
    pub confirm_actions: Option<bool>,
    /// New auto-sleep.
    pub auto_sleep_ms: Option<u64>,
    /// New timeout.
    pub timeout_seconds: Option<u64>,
}

/// A scripted bulk transformation over the children of `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecAction {
    /// Path whose children are visited.
    pub path: String,
    /// Predicate over `key` and `value`.
    pub target_expr: String,
    /// Transform yielding `("DELETE", key)` or `("SET", key, value)`.
    pub action_expr: String,
}

/// One replayable operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordedAction {
    /// Pure delay.
    Sleep {
        /// Delay in milliseconds.
        time_ms: u64,
    },
    /// Write `value` at `key`.
    Edit {
        /// Store path.
        key: String,
        /// Value to write.
        value: Value,
    },
    /// Clear the value at `key`.
    Delete {
        /// Store path.
        key: String,
    },
    /// Read `key` for the playback log.
    Get {
        /// Store path.
        key: String,
    },
    /// Expand into edits and deletes at playback time.
    Exec(ExecAction),
}

/// Header plus ordered actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFile {
    /// Playback policy.
    pub header: ActionHeader,
    /// Actions in recording order.
    pub actions: Vec<RecordedAction>,
}

impl PlayMode {
    /// Returns the literal used in recording files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Loop => "loop",
        }
    }
}

impl FromStr for PlayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "loop" => Ok(Self::Loop),
            other => Err(format!("unknown play mode '{other}' (expected normal or loop)")),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ActionHeader {
    fn default() -> Self {
        Self {
            play_mode: PlayMode::Normal,
            confirm_actions: true,
            auto_sleep_ms: DEFAULT_AUTO_SLEEP_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ActionHeader {
    /// Applies the set fields of `update`.
    pub fn apply(&mut self, update: HeaderUpdate) {
        if let Some(play_mode) = update.play_mode {
            self.play_mode = play_mode;
        }
        if let Some(confirm) = update.confirm_actions {
            self.confirm_actions = confirm;
        }
        if let Some(ms) = update.auto_sleep_ms {
            self.auto_sleep_ms = ms;
        }
        if let Some(secs) = update.timeout_seconds {
            self.timeout_seconds = secs;
        }
    }

    /// Returns true if `action` must wait for confirmation under this header.
    #[must_use]
    pub const fn requires_confirmation(&self, action: &RecordedAction) -> bool {
        self.confirm_actions && action.is_mutation()
    }
}

impl HeaderUpdate {
    /// Sets the play mode.
    #[must_use]
    pub const fn play_mode(mut self, mode: PlayMode) -> Self {
        self.play_mode = Some(mode);
        self
    }

    /// Sets the confirmation flag.
    #[must_use]
    pub const fn confirm_actions(mut self, confirm: bool) -> Self {
        self.confirm_actions = Some(confirm);
        self
    }

    /// Sets the auto-sleep.
    #[must_use]
    pub const fn auto_sleep_ms(mut self, ms: u64) -> Self {
        self.auto_sleep_ms = Some(ms);
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }
}

impl ExecAction {
    /// Creates an exec action.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        target_expr: impl Into<String>,
        action_expr: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            target_expr: target_expr.into(),
            action_expr: action_expr.into(),
        }
    }
}

impl RecordedAction {
    /// Creates an edit action.
    #[must_use]
    pub fn edit(key: impl Into<String>, value: Value) -> Self {
        Self::Edit {
            key: key.into(),
            value,
        }
    }

    /// Creates a delete action.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Creates a get action.
    #[must_use]
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    /// Returns the tag used in recording files.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Sleep { .. } => "sleep",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Get { .. } => "get",
            Self::Exec(_) => "exec",
        }
    }

    /// Returns true for actions that write to the store.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Edit { .. } | Self::Delete { .. })
    }

    /// Returns the store path the action targets, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Sleep { .. } => None,
            Self::Edit { key, .. } | Self::Delete { key } | Self::Get { key } => Some(key.as_str()),
            Self::Exec(exec) => Some(exec.path.as_str()),
        }
    }
}

impl fmt::Display for RecordedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sleep { time_ms } => write!(f, "sleep {time_ms}ms"),
            Self::Edit { key, value } => write!(f, "edit {key} = {value}"),
            Self::Delete { key } => write!(f, "delete {key}"),
            Self::Get { key } => write!(f, "get {key}"),
            Self::Exec(exec) => write!(
                f,
                "exec {} where {} => {}",
                exec.path, exec.target_expr, exec.action_expr
            ),
        }
    }
}

impl RecordingFile {
    /// Creates a recording.
    #[must_use]
    pub const fn new(header: ActionHeader, actions: Vec<RecordedAction>) -> Self {
        Self { header, actions }
    }

    /// Serializes to recording text.
    #[must_use]
    pub fn to_text(&self) -> String {
        codec::encode(self)
    }

    /// SHA-256 of the recording text, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the number of actions that write to the store directly.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_mutation()).count()
    }
}

impl FromStr for RecordingFile {
    type Err = crate::error::FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        codec::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_defaults() {
        let header = ActionHeader::default();
        assert_eq!(header.play_mode, PlayMode::Normal);
        assert!(header.confirm_actions);
        assert_eq!(header.auto_sleep_ms, 500);
        assert_eq!(header.timeout_seconds, 30);
    }

    #[test]
    fn test_header_partial_update() {
        let mut header = ActionHeader::default();
        header.apply(HeaderUpdate::default().play_mode(PlayMode::Loop).auto_sleep_ms(0));

        assert_eq!(header.play_mode, PlayMode::Loop);
        assert_eq!(header.auto_sleep_ms, 0);
        assert!(header.confirm_actions);
        assert_eq!(header.timeout_seconds, 30);
    }

    #[test]
    fn test_confirmation_only_gates_mutations() {
        let header = ActionHeader::default();
        assert!(header.requires_confirmation(&RecordedAction::edit("/a", json!(1))));
        assert!(header.requires_confirmation(&RecordedAction::delete("/a")));
        assert!(!header.requires_confirmation(&RecordedAction::get("/a")));
        assert!(!header.requires_confirmation(&RecordedAction::Sleep { time_ms: 10 }));

        let relaxed = ActionHeader {
            confirm_actions: false,
            ..ActionHeader::default()
        };
        assert!(!relaxed.requires_confirmation(&RecordedAction::delete("/a")));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = RecordingFile::new(ActionHeader::default(), vec![RecordedAction::get("/a")]);
        let b = RecordingFile::new(ActionHeader::default(), vec![RecordedAction::get("/b")]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
