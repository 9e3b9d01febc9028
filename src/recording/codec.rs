//! Line-oriented recording text format.
//!
//! ```text
//! normal true 500 30
//! edit /users/a {"status":"ok"}
//! delete /users/b
//! get /users
//! sleep 1000
//! exec /users <base64 predicate> <base64 transform>
//! ```
//!
//! The first line is the header (`playMode confirmActions autoSleepMs
//! timeoutSeconds`); every following non-blank line is one action. Decoding
//! stops at the first bad line.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::fmt::Write;
use tracing::debug;

use crate::error::FormatError;

use super::action::{ActionHeader, ExecAction, PlayMode, RecordedAction, RecordingFile};

/// Serializes a recording to text.
#[must_use]
pub fn encode(file: &RecordingFile) -> String {
    let mut out = encode_header(&file.header);
    out.push('\n');
    for action in &file.actions {
        out.push_str(&encode_action(action));
        out.push('\n');
    }
    out
}

/// Parses recording text.
///
/// # Errors
///
/// Returns a [`FormatError`] naming the first malformed line.
pub fn decode(text: &str) -> Result<RecordingFile, FormatError> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    let header_line = lines.next().map_or("", |(_, line)| line);
    let header = decode_header(header_line)?;

    let mut actions = Vec::new();
    for (number, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        actions.push(decode_action(number, line)?);
    }

    debug!("Decoded recording with {} actions", actions.len());
    Ok(RecordingFile::new(header, actions))
}

fn encode_header(header: &ActionHeader) -> String {
    format!(
        "{} {} {} {}",
        header.play_mode, header.confirm_actions, header.auto_sleep_ms, header.timeout_seconds
    )
}

fn encode_action(action: &RecordedAction) -> String {
    let mut line = String::from(action.tag());
    let _ = match action {
        RecordedAction::Sleep { time_ms } => write!(line, " {time_ms}"),
        // Value's Display is compact JSON and never contains a raw newline.
        RecordedAction::Edit { key, value } => write!(line, " {key} {value}"),
        RecordedAction::Delete { key } | RecordedAction::Get { key } => write!(line, " {key}"),
        RecordedAction::Exec(exec) => write!(
            line,
            " {} {} {}",
            exec.path,
            STANDARD.encode(&exec.target_expr),
            STANDARD.encode(&exec.action_expr)
        ),
    };
    line
}

fn decode_header(line: &str) -> Result<ActionHeader, FormatError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(FormatError::at_line(
            1,
            format!("header needs 4 fields, found {}", tokens.len()),
        ));
    }

    let play_mode: PlayMode = tokens[0]
        .parse()
        .map_err(|e: String| FormatError::at_line(1, e))?;

    let confirm_actions = match tokens[1] {
        "true" => true,
        "false" => false,
        other => {
            return Err(FormatError::at_line(
                1,
                format!("confirmActions must be 'true' or 'false', found '{other}'"),
            ));
        }
    };

    let auto_sleep_ms = parse_uint(1, "autoSleepMs", tokens[2])?;
    let timeout_seconds = parse_uint(1, "timeoutSeconds", tokens[3])?;

    Ok(ActionHeader {
        play_mode,
        confirm_actions,
        auto_sleep_ms,
        timeout_seconds,
    })
}

fn decode_action(number: usize, line: &str) -> Result<RecordedAction, FormatError> {
    let (tag, rest) = split_token(line);

    match tag {
        "sleep" => {
            let (time, _) = split_token(rest);
            let time = required(number, tag, "timeMs", time)?;
            Ok(RecordedAction::Sleep {
                time_ms: parse_uint(number, "timeMs", time)?,
            })
        }
        "edit" => {
            let (key, remainder) = split_token(rest);
            let key = required(number, tag, "key", key)?;
            let remainder = required(number, tag, "value", remainder.trim())?;
            Ok(RecordedAction::edit(key, parse_edit_value(remainder)))
        }
        "delete" => {
            let (key, _) = split_token(rest);
            Ok(RecordedAction::delete(required(number, tag, "key", key)?))
        }
        "get" => {
            let (key, _) = split_token(rest);
            Ok(RecordedAction::get(required(number, tag, "key", key)?))
        }
        "exec" => {
            let mut tokens = rest.split_whitespace();
            let path = required(number, tag, "path", tokens.next().unwrap_or(""))?;
            let target = required(number, tag, "targetExpr", tokens.next().unwrap_or(""))?;
            let action = required(number, tag, "actionExpr", tokens.next().unwrap_or(""))?;
            Ok(RecordedAction::Exec(ExecAction::new(
                path,
                decode_expr(number, "targetExpr", target)?,
                decode_expr(number, "actionExpr", action)?,
            )))
        }
        other => Err(FormatError::at_line(
            number,
            format!("unknown action tag '{other}'"),
        )),
    }
}

/// Parses the value of an edit line.
///
/// The remainder is tried as JSON first. When that fails the remainder's
/// whitespace-separated words, rejoined with single spaces, become a string
/// value. This fallback is not an error.
#[must_use]
pub fn parse_edit_value(remainder: &str) -> Value {
    serde_json::from_str(remainder).unwrap_or_else(|_| {
        let words: Vec<&str> = remainder.split_whitespace().collect();
        Value::String(words.join(" "))
    })
}

/// Splits off the first whitespace-delimited token and returns it with the
/// untouched rest of the line.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(pos) => {
            let (token, rest) = s.split_at(pos);
            let mut chars = rest.chars();
            chars.next();
            (token, chars.as_str())
        }
        None => (s, ""),
    }
}

fn required<'a>(
    number: usize,
    tag: &str,
    field: &str,
    token: &'a str,
) -> Result<&'a str, FormatError> {
    if token.is_empty() {
        Err(FormatError::at_line(
            number,
            format!("'{tag}' is missing its {field}"),
        ))
    } else {
        Ok(token)
    }
}

fn parse_uint(number: usize, field: &str, token: &str) -> Result<u64, FormatError> {
    token.parse::<u64>().map_err(|_| {
        FormatError::at_line(
            number,
            format!("{field} must be a non-negative integer, found '{token}'"),
        )
    })
}

fn decode_expr(number: usize, field: &str, token: &str) -> Result<String, FormatError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|e| FormatError::at_line(number, format!("{field} is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| FormatError::at_line(number, format!("{field} is not valid UTF-8")))
}
