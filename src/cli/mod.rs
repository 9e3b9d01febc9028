//! CLI module for the treeplay tool.
//!
//! This module provides the command-line interface for editing the store,
//! reviewing diffs, and recording and replaying changes.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, RecordCommands};
pub use output::OutputFormatter;
