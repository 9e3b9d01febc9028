// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Treeplay
//!
//! Diff, record, and scripted replay of mutations against a hierarchical
//! key/value store.
//!
//! ## Overview
//!
//! Treeplay treats a store as one JSON-like tree addressed by slash paths and
//! lets you:
//!
//! - Compare two snapshots of a subtree and apply a reviewed selection of the
//!   differences
//! - Record edits, deletes, reads, pauses, and scripted bulk transformations
//!   into a plain text recording
//! - Replay a recording one action at a time, with operator confirmation,
//!   pacing, looping, and a progress watchdog
//!
//! ## Architecture
//!
//! 1. **Store**: [`store::TreeStore`] backends read and write nodes by path
//! 2. **Recording**: [`recording::RecordingSession`] captures what the
//!    [`store::TreeEditor`] does; the codec turns it into text
//! 3. **Playback**: [`playback::PlaybackEngine`] owns a
//!    [`playback::PlaybackSession`] and is driven through a
//!    [`playback::PlaybackHandle`]
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`store`]: Store trait, backends, and path helpers
//! - [`diff`]: Structural diff and review
//! - [`recording`]: Action model, text codec, and capture session
//! - [`exec`]: Expression language for scripted transformations
//! - [`playback`]: Playback state machine and async engine
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```text
//! normal false 0 30
//! edit /users/alice {"status": "active"}
//! sleep 250
//! exec /users <base64 target> <base64 action>
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod exec;
pub mod playback;
pub mod recording;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ToolConfig};
pub use diff::{DiffChange, DiffEngine, DiffKind, DiffReview};
pub use error::{Result, TreeplayError};
pub use exec::ExecInterpreter;
pub use playback::{PlaybackEngine, PlaybackHandle, PlaybackSession, PlaybackState};
pub use recording::{ActionHeader, RecordedAction, RecordingFile, RecordingSession};
pub use store::{JsonFileStore, MemoryStore, TreeEditor, TreeStore};
