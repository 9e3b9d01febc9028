//! Configuration types for the treeplay tool.
//!
//! This module defines the structs that map to the `treeplay.yaml` file.
//! Every section is optional; an empty file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::recording::{ActionHeader, DEFAULT_AUTO_SLEEP_MS, DEFAULT_TIMEOUT_SECONDS, PlayMode};

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Defaults for new recordings.
    #[serde(default)]
    pub recording: RecordingDefaults,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON file holding the tree (required for the file backend).
    #[serde(default = "default_store_path")]
    pub path: Option<PathBuf>,
}

/// Store backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process tree, discarded on exit.
    Memory,
    /// Tree persisted in a single JSON file.
    #[default]
    File,
}

/// Header defaults applied to recordings created by the CLI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingDefaults {
    /// End-of-queue behavior.
    #[serde(default)]
    pub play_mode: PlayMode,
    /// Whether edits and deletes wait for confirmation.
    #[serde(default = "default_confirm_actions")]
    pub confirm_actions: bool,
    /// Pause after each executed action, in milliseconds.
    #[serde(default = "default_auto_sleep_ms")]
    pub auto_sleep_ms: u64,
    /// Watchdog timeout in seconds; zero disables it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. `info`, `treeplay=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Store file used when none is configured.
pub const DEFAULT_STORE_FILE: &str = "treeplay-store.json";

fn default_store_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_STORE_FILE))
}

const fn default_confirm_actions() -> bool {
    true
}

const fn default_auto_sleep_ms() -> u64 {
    DEFAULT_AUTO_SLEEP_MS
}

const fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_log_level() -> String {
    String::from("info")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            play_mode: PlayMode::Normal,
            confirm_actions: default_confirm_actions(),
            auto_sleep_ms: default_auto_sleep_ms(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl RecordingDefaults {
    /// Builds the header for a new recording.
    #[must_use]
    pub const fn header(&self) -> ActionHeader {
        ActionHeader {
            play_mode: self.play_mode,
            confirm_actions: self.confirm_actions,
            auto_sleep_ms: self.auto_sleep_ms,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(format!("unknown store backend '{other}' (expected memory or file)")),
        }
    }
}
