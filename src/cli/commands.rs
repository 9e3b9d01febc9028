//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::recording::PlayMode;

/// Treeplay - diff, record, and replay changes to a hierarchical key/value store.
#[derive(Parser, Debug)]
#[command(name = "treeplay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "TREEPLAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read the value at a store path.
    Get {
        /// Store path (e.g. `/users/alice`).
        key: String,

        /// Append the read to this recording file.
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Write a JSON value at a store path.
    Set {
        /// Store path.
        key: String,

        /// JSON value (quote strings: '"text"').
        value: String,

        /// Append the edit to this recording file.
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Remove the value at a store path.
    Delete {
        /// Store path.
        key: String,

        /// Append the delete to this recording file.
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Show the differences between two JSON documents.
    Diff {
        /// Original document.
        original: PathBuf,

        /// Modified document.
        modified: PathBuf,

        /// Write the diff as JSON to this file.
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Apply the differences between two JSON documents to the store.
    Apply {
        /// Original document.
        original: PathBuf,

        /// Modified document.
        modified: PathBuf,

        /// Store path the documents correspond to.
        #[arg(short, long, default_value = "/")]
        path: String,

        /// Change numbers (as listed by `diff`) to leave out.
        #[arg(short = 'x', long, num_args = 1..)]
        exclude: Vec<usize>,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Create and edit recording files.
    Record {
        /// Recording subcommand.
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Preview the actions an exec would produce against the current store.
    Expand {
        /// Path whose children are visited.
        path: String,

        /// Predicate over `key` and `value`.
        target: String,

        /// Expression yielding `("DELETE", key)` or `("SET", key, value)`.
        action: String,
    },

    /// Replay a recording against the store.
    Play {
        /// Recording file.
        file: PathBuf,

        /// Confirm every gated action automatically.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Recording file subcommands.
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Create an empty recording (header defaults come from the configuration).
    New {
        /// Recording file to create.
        file: PathBuf,

        /// End-of-queue behavior (normal, loop).
        #[arg(long)]
        play_mode: Option<PlayMode>,

        /// Whether edits and deletes wait for confirmation.
        #[arg(long)]
        confirm: Option<bool>,

        /// Pause after each executed action, in milliseconds.
        #[arg(long)]
        auto_sleep_ms: Option<u64>,

        /// Watchdog timeout in seconds (0 disables it).
        #[arg(long)]
        timeout: Option<u64>,

        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },

    /// Append an exec action.
    Exec {
        /// Recording file.
        file: PathBuf,

        /// Path whose children are visited.
        path: String,

        /// Predicate over `key` and `value`.
        target: String,

        /// Expression yielding `("DELETE", key)` or `("SET", key, value)`.
        action: String,
    },

    /// Append a sleep action.
    Sleep {
        /// Recording file.
        file: PathBuf,

        /// Delay in milliseconds.
        ms: u64,
    },

    /// Print a recording.
    Show {
        /// Recording file.
        file: PathBuf,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

impl Cli {
    /// Parses command line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
