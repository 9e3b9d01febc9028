//! Error types for the treeplay toolkit.
//!
//! This module provides the error hierarchy for every stage of the
//! diff / record / replay lifecycle: recording text parsing, exec expression
//! evaluation, store access, operator input validation, and playback control.

use std::path::PathBuf;
use thiserror::Error;

use crate::playback::PlaybackState;

/// The main error type for the treeplay toolkit.
#[derive(Debug, Error)]
pub enum TreeplayError {
    /// Malformed recording text.
    #[error("Recording format error: {0}")]
    Format(#[from] FormatError),

    /// Exec expression failure.
    #[error("Expression error: {0}")]
    Eval(#[from] EvalError),

    /// Store access failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Operator-supplied value rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Recording session misuse.
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    /// Playback control errors.
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Malformed recording text.
///
/// Line numbers are 1-based; line 1 is the header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct FormatError {
    /// Line on which parsing stopped.
    pub line: usize,
    /// Description of the problem.
    pub message: String,
}

/// Failure while lexing, parsing, or evaluating an exec expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression text is not valid.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the expression source.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// An operator or builtin was applied to values of the wrong type.
    #[error("type error: {message}")]
    Type {
        /// Description of the mismatch.
        message: String,
    },

    /// An identifier other than the bound variables was referenced.
    #[error("unknown identifier: {name}")]
    UnknownIdentifier {
        /// The identifier.
        name: String,
    },

    /// A call to a function that is not a builtin.
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// The function name.
        name: String,
    },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The expression is too long or too deeply nested.
    #[error("expression limit exceeded: {message}")]
    LimitExceeded {
        /// Which limit was hit.
        message: String,
    },

    /// The action expression produced something other than a DELETE/SET tuple.
    #[error("unexpected action shape: {found}")]
    UnexpectedShape {
        /// Rendering of the offending value.
        found: String,
    },
}

/// Store access failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached or returned a failure.
    #[error("transport failure at '{path}': {message}")]
    Transport {
        /// Path being accessed.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// The backend's persisted data could not be decoded.
    #[error("store data is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },
}

/// Operator-supplied input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A value supplied for an edit is not valid JSON.
    #[error("invalid JSON value: {message}")]
    InvalidJson {
        /// Parser message.
        message: String,
    },

    /// A path is not usable.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        message: String,
    },

    /// A diff change index is out of range.
    #[error("change index {index} out of range (have {len})")]
    ChangeIndex {
        /// Requested index.
        index: usize,
        /// Number of changes available.
        len: usize,
    },
}

/// Recording session misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    /// The header may not change once an active session has buffered actions.
    #[error("header is locked: {buffered} action(s) already recorded")]
    HeaderLocked {
        /// Number of actions in the buffer.
        buffered: usize,
    },
}

/// Playback control errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// A command is not valid in the current state.
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        /// Command that was attempted.
        command: &'static str,
        /// State at the time.
        state: PlaybackState,
    },

    /// The engine task is no longer running.
    #[error("playback engine has shut down")]
    EngineGone,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Result type alias for treeplay operations.
pub type Result<T> = std::result::Result<T, TreeplayError>;

impl TreeplayError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if playback can continue after this error.
    ///
    /// Store failures pause playback and leave the failing action in place;
    /// everything else ends the operation that raised it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Transport { .. }))
    }
}

impl FormatError {
    /// Creates a format error for the given 1-based line.
    #[must_use]
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl EvalError {
    /// Creates a syntax error at a byte offset.
    #[must_use]
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates a type error.
    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }
}

impl StoreError {
    /// Creates a transport error for a path.
    #[must_use]
    pub fn transport(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display_includes_line() {
        let err = FormatError::at_line(3, "unknown action tag 'foo'");
        assert_eq!(err.to_string(), "line 3: unknown action tag 'foo'");
    }

    #[test]
    fn test_store_errors_are_recoverable() {
        let err = TreeplayError::from(StoreError::transport("/a", "connection reset"));
        assert!(err.is_recoverable());

        let err = TreeplayError::from(FormatError::at_line(1, "bad header"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = PlaybackError::InvalidTransition {
            command: "confirm",
            state: PlaybackState::Paused,
        };
        assert_eq!(err.to_string(), "cannot confirm while paused");
    }
}
