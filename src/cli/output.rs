//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde_json::Value;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::diff::{ApplyReport, DiffKind, DiffReview};
use crate::playback::{PlaybackLogEntry, PlaybackState, PlaybackStatus};
use crate::recording::{RecordedAction, RecordingFile};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Diff change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Change")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Old")]
    old: String,
    #[tabled(rename = "New")]
    new: String,
}

/// Recorded action row for table display.
#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    tag: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

const VALUE_WIDTH: usize = 40;

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the value read from a key.
    #[must_use]
    pub fn format_value(&self, key: &str, value: Option<&Value>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "key": key, "value": value })),
            OutputFormat::Text => match value {
                Some(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
                None => format!("{} {key} is empty", "∅".dimmed()),
            },
        }
    }

    /// Formats a diff review for display.
    #[must_use]
    pub fn format_diff(&self, review: &DiffReview) -> String {
        match self.format {
            OutputFormat::Json => to_json(&review.export_json()),
            OutputFormat::Text => Self::format_diff_text(review),
        }
    }

    fn format_diff_text(review: &DiffReview) -> String {
        if review.is_empty() {
            return format!("{} No differences.\n", "✓".green());
        }

        let rows: Vec<ChangeRow> = review
            .changes
            .iter()
            .enumerate()
            .map(|(i, c)| ChangeRow {
                index: i,
                kind: Self::format_kind(c.kind, c.selected),
                path: c.path_string(),
                old: c.old_value.as_ref().map_or_else(String::new, render_value),
                new: c.new_value.as_ref().map_or_else(String::new, render_value),
            })
            .collect();

        let mut output = format!("\nChanges under {}\n\n", review.base_path.bold());
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nDiff: {} to create, {} to edit, {} to delete\n",
            review.count(DiffKind::Create).to_string().green(),
            review.count(DiffKind::Edit).to_string().yellow(),
            review.count(DiffKind::Delete).to_string().red()
        );
        output
    }

    /// Formats the outcome of an apply.
    #[must_use]
    pub fn format_apply(&self, report: &ApplyReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => format!(
                "{} Applied {} changes ({} skipped)\n",
                "✓".green(),
                report.applied,
                report.skipped
            ),
        }
    }

    /// Formats a recording with its header.
    #[must_use]
    pub fn format_recording(&self, recording: &RecordingFile) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "fingerprint": recording.fingerprint(),
                "header": recording.header,
                "actions": recording.actions,
            })),
            OutputFormat::Text => {
                let header = &recording.header;
                let mut output = String::from("\nRecording\n");
                let _ = writeln!(output, "   Play mode: {}", header.play_mode);
                let _ = writeln!(output, "   Confirm actions: {}", header.confirm_actions);
                let _ = writeln!(output, "   Auto sleep: {}ms", header.auto_sleep_ms);
                let _ = writeln!(output, "   Timeout: {}s", header.timeout_seconds);
                let _ = writeln!(output, "   Fingerprint: {}", &recording.fingerprint()[..12]);
                output.push('\n');
                output.push_str(&Self::format_actions_text(&recording.actions));
                output
            }
        }
    }

    /// Formats a list of actions, such as an exec preview.
    #[must_use]
    pub fn format_actions(&self, actions: &[RecordedAction]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&actions),
            OutputFormat::Text => Self::format_actions_text(actions),
        }
    }

    fn format_actions_text(actions: &[RecordedAction]) -> String {
        if actions.is_empty() {
            return format!("   {}\n", "No actions.".dimmed());
        }

        let rows: Vec<ActionRow> = actions
            .iter()
            .enumerate()
            .map(|(i, a)| ActionRow {
                index: i,
                tag: Self::format_tag(a),
                target: a.target().unwrap_or_default().to_string(),
                detail: Self::action_detail(a),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Formats a playback status line.
    #[must_use]
    pub fn format_status(&self, status: &PlaybackStatus) -> String {
        match self.format {
            OutputFormat::Json => to_json(status),
            OutputFormat::Text => {
                let mut output = format!(
                    "[{}] {}/{}",
                    Self::format_state(status.state),
                    status.index,
                    status.queue_len
                );
                if status.loop_count > 0 {
                    let _ = write!(output, " loop {}", status.loop_count);
                }
                if let Some(pending) = &status.pending {
                    let _ = write!(output, " next: {pending}");
                }
                if let Some(error) = &status.last_error {
                    let _ = write!(output, "\n   {} {error}", "✗".red());
                }
                output
            }
        }
    }

    /// Formats the playback result log.
    #[must_use]
    pub fn format_log<'a>(&self, entries: impl IntoIterator<Item = &'a PlaybackLogEntry>) -> String {
        let entries: Vec<&PlaybackLogEntry> = entries.into_iter().collect();
        match self.format {
            OutputFormat::Json => to_json(&entries),
            OutputFormat::Text => {
                let mut output = String::new();
                for entry in entries {
                    let _ = writeln!(
                        output,
                        "   {} #{} {}",
                        entry.at.format("%H:%M:%S").to_string().dimmed(),
                        entry.index,
                        entry.message
                    );
                }
                output
            }
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow().to_string(), message)
    }

    fn message(&self, status: &str, marker: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "status": status, "message": message })),
            OutputFormat::Text => format!("{marker} {message}"),
        }
    }

    /// Formats a diff kind with color; deselected changes are dimmed.
    fn format_kind(kind: DiffKind, selected: bool) -> String {
        if !selected {
            return format!("({kind})").dimmed().to_string();
        }
        match kind {
            DiffKind::Create => "+create".green().to_string(),
            DiffKind::Edit => "~edit".yellow().to_string(),
            DiffKind::Delete => "-delete".red().to_string(),
        }
    }

    fn format_tag(action: &RecordedAction) -> String {
        let tag = action.tag();
        match action {
            RecordedAction::Edit { .. } => tag.yellow().to_string(),
            RecordedAction::Delete { .. } => tag.red().to_string(),
            RecordedAction::Exec(_) => tag.cyan().to_string(),
            RecordedAction::Get { .. } | RecordedAction::Sleep { .. } => tag.dimmed().to_string(),
        }
    }

    fn action_detail(action: &RecordedAction) -> String {
        match action {
            RecordedAction::Edit { value, .. } => render_value(value),
            RecordedAction::Sleep { time_ms } => format!("{time_ms}ms"),
            RecordedAction::Delete { .. } | RecordedAction::Get { .. } => String::new(),
            RecordedAction::Exec(exec) => truncate(
                &format!("{} => {}", exec.target_expr, exec.action_expr),
                VALUE_WIDTH,
            ),
        }
    }

    /// Formats a playback state with color.
    fn format_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::Running => state.as_str().green().to_string(),
            PlaybackState::Paused => state.as_str().yellow().to_string(),
            PlaybackState::WaitingConfirm => state.as_str().cyan().to_string(),
            PlaybackState::Completed => state.as_str().green().bold().to_string(),
            PlaybackState::Stopped => state.as_str().red().to_string(),
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn render_value(value: &Value) -> String {
    truncate(&value.to_string(), VALUE_WIDTH)
}

/// Truncates a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::ActionHeader;
    use serde_json::json;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_json_diff_output() {
        let review = DiffReview::compute("/cfg", &json!({"a": 1}), &json!({"a": 2, "b": true}));
        let text = OutputFormatter::new(OutputFormat::Json).format_diff(&review);
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["base_path"], "/cfg");
        assert_eq!(parsed["creates"], 1);
        assert_eq!(parsed["edits"], 1);
    }

    #[test]
    fn test_text_diff_lists_paths() {
        colored::control::set_override(false);
        let review = DiffReview::compute("/", &json!({"a": 1}), &json!({}));
        let text = OutputFormatter::new(OutputFormat::Text).format_diff(&review);
        assert!(text.contains("-delete"));
        assert!(text.contains("/a"));
    }

    #[test]
    fn test_empty_diff_text() {
        let review = DiffReview::compute("/", &json!({"a": 1}), &json!({"a": 1}));
        let text = OutputFormatter::new(OutputFormat::Text).format_diff(&review);
        assert!(text.contains("No differences"));
    }

    #[test]
    fn test_recording_json_has_fingerprint() {
        let recording = RecordingFile::new(
            ActionHeader::default(),
            vec![RecordedAction::delete("/users/a"), RecordedAction::Sleep { time_ms: 5 }],
        );
        let text = OutputFormatter::new(OutputFormat::Json).format_recording(&recording);
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["fingerprint"], recording.fingerprint());
        assert_eq!(parsed["actions"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_value_output() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let parsed: Value =
            serde_json::from_str(&formatter.format_value("/k", None)).expect("valid json");
        assert_eq!(parsed, json!({"key": "/k", "value": null}));
    }
}
