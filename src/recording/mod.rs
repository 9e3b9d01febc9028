//! Recording module: the replayable action vocabulary and its persistence.
//!
//! This module handles:
//! - The action header and the five action kinds
//! - The line-oriented recording text codec
//! - The capture session that appends actions as the store is edited
//! - Loading and saving recordings and JSON dumps

mod action;
pub mod codec;
mod session;
mod storage;

pub use action::{
    ActionHeader, ExecAction, HeaderUpdate, PlayMode, RecordedAction, RecordingFile,
    DEFAULT_AUTO_SLEEP_MS, DEFAULT_TIMEOUT_SECONDS,
};
pub use session::RecordingSession;
pub use storage::RecordingStorage;
