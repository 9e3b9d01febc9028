//! Playback state machine.
//!
//! [`PlaybackSession`] owns the action queue and applies commands and step
//! outcomes. It performs no I/O; the engine decides what to run from
//! [`PlaybackSession::next_step`] and reports back with
//! [`PlaybackSession::complete_step`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, info};

use crate::error::{PlaybackError, StoreError};
use crate::recording::{ActionHeader, ExecAction, PlayMode, RecordedAction, RecordingFile};

/// Number of log entries kept per session.
pub const MAX_LOG_ENTRIES: usize = 256;

/// Rest before repeating a loop pass that executed nothing, when the header
/// sets no auto sleep.
pub const IDLE_PASS_REST_MS: u64 = 1_000;

/// Playback state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Not advancing. Initial state, and where store failures land.
    #[default]
    Paused,
    /// Advancing through the queue.
    Running,
    /// Holding an edit or delete until the operator confirms or declines it.
    WaitingConfirm,
    /// Ran past the end of the queue in normal mode.
    Completed,
    /// Stopped by the operator or the watchdog.
    Stopped,
}

impl PlaybackState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Running => "running",
            Self::WaitingConfirm => "waiting_confirm",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }

    /// Returns true for `Completed` and `Stopped`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }

    /// Returns true for the states the watchdog covers.
    #[must_use]
    pub const fn is_watched(self) -> bool {
        matches!(self, Self::Running | Self::WaitingConfirm)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the playback log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackLogEntry {
    /// When the entry was written.
    pub at: DateTime<Utc>,
    /// Queue index the entry refers to.
    pub index: usize,
    /// What happened.
    pub message: String,
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    /// Current state.
    pub state: PlaybackState,
    /// Index of the next action.
    pub index: usize,
    /// Current queue length.
    pub queue_len: usize,
    /// Completed passes in loop mode.
    pub loop_count: u64,
    /// Action at `index`, if any.
    pub pending: Option<RecordedAction>,
    /// Message from the last executed action.
    pub last_result: Option<String>,
    /// Message from the last store failure.
    pub last_error: Option<String>,
    /// Actions executed against the store (sleeps excluded).
    pub executed: usize,
}

/// What the engine should run next.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Nothing to run in the current state.
    Idle,
    /// Suspend for the given milliseconds.
    Sleep(u64),
    /// Write (or clear, for `None`) the value at a key.
    Write {
        /// Store path.
        key: String,
        /// Value to write.
        value: Option<Value>,
    },
    /// Read a key for the log.
    Read {
        /// Store path.
        key: String,
    },
    /// Expand an exec action against live data.
    Expand(ExecAction),
    /// Wait before repeating a loop pass that did nothing.
    Rest(u64),
}

/// Result of running a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// An exec expansion to splice over the current entry.
    Expanded(Vec<RecordedAction>),
    /// A store action completed.
    Executed(String),
    /// A sleep action completed.
    Slept,
    /// The rest before an idle loop pass completed.
    Rested,
    /// The store rejected the step.
    Failed(StoreError),
}

/// Mutable playback state for one recording.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    header: ActionHeader,
    original: Vec<RecordedAction>,
    queue: Vec<RecordedAction>,
    index: usize,
    loop_count: u64,
    state: PlaybackState,
    approved: bool,
    executed: usize,
    last_result: Option<String>,
    last_error: Option<String>,
    log: VecDeque<PlaybackLogEntry>,
    epoch: u64,
    pass_progress: bool,
    rested: bool,
}

impl PlaybackSession {
    /// Creates a paused session over `recording`.
    #[must_use]
    pub fn new(recording: RecordingFile) -> Self {
        Self {
            header: recording.header,
            queue: recording.actions.clone(),
            original: recording.actions,
            index: 0,
            loop_count: 0,
            state: PlaybackState::Paused,
            approved: false,
            executed: 0,
            last_result: None,
            last_error: None,
            log: VecDeque::new(),
            epoch: 0,
            pass_progress: false,
            rested: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Returns the playback header.
    #[must_use]
    pub const fn header(&self) -> &ActionHeader {
        &self.header
    }

    /// Returns the index of the next action.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the live queue.
    #[must_use]
    pub fn queue(&self) -> &[RecordedAction] {
        &self.queue
    }

    /// Returns the number of completed loop passes.
    #[must_use]
    pub const fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// Returns the number of store actions executed.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.executed
    }

    /// Returns the action at the current index.
    #[must_use]
    pub fn current(&self) -> Option<&RecordedAction> {
        self.queue.get(self.index)
    }

    /// Returns the playback log, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &PlaybackLogEntry> {
        self.log.iter()
    }

    /// Counter bumped on every transition and on every step that made
    /// progress. Empty exec expansions and idle loop passes leave it alone.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Builds a status snapshot.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            index: self.index,
            queue_len: self.queue.len(),
            loop_count: self.loop_count,
            pending: self.current().cloned(),
            last_result: self.last_result.clone(),
            last_error: self.last_error.clone(),
            executed: self.executed,
        }
    }

    /// `PAUSED -> RUNNING`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        self.require("start", &[PlaybackState::Paused])?;
        self.set_state(PlaybackState::Running);
        Ok(())
    }

    /// `RUNNING -> PAUSED`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.require("pause", &[PlaybackState::Running])?;
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    /// `RUNNING | WAITING_CONFIRM -> STOPPED`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.require("stop", &[PlaybackState::Running, PlaybackState::WaitingConfirm])?;
        self.set_state(PlaybackState::Stopped);
        Ok(())
    }

    /// Watchdog expiry. Returns false if the state is not watched.
    pub fn timeout(&mut self) -> bool {
        if !self.state.is_watched() {
            return false;
        }
        self.push_log(format!(
            "timed out after {}s in {}",
            self.header.timeout_seconds, self.state
        ));
        self.set_state(PlaybackState::Stopped);
        true
    }

    /// Approves the held action: `WAITING_CONFIRM -> RUNNING`.
    ///
    /// The held action runs on the next step and the index advances once it
    /// has executed.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn confirm(&mut self) -> Result<(), PlaybackError> {
        self.require("confirm", &[PlaybackState::WaitingConfirm])?;
        self.set_state(PlaybackState::Running);
        self.approved = true;
        Ok(())
    }

    /// Skips the held action: `WAITING_CONFIRM -> RUNNING`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn decline(&mut self) -> Result<(), PlaybackError> {
        self.require("decline", &[PlaybackState::WaitingConfirm])?;
        self.push_log(String::from("declined"));
        self.index += 1;
        self.set_state(PlaybackState::Running);
        Ok(())
    }

    /// Advances past the current action without running it, clamped to the
    /// last index of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless paused or running.
    pub fn skip(&mut self) -> Result<(), PlaybackError> {
        self.require("skip", &[PlaybackState::Paused, PlaybackState::Running])?;
        self.push_log(String::from("skipped"));
        self.index = (self.index + 1).min(self.queue.len().saturating_sub(1));
        self.approved = false;
        self.epoch += 1;
        Ok(())
    }

    /// `COMPLETED | STOPPED -> PAUSED` with the queue reset.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] from any other state.
    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        self.require("restart", &[PlaybackState::Completed, PlaybackState::Stopped])?;
        self.queue.clone_from(&self.original);
        self.index = 0;
        self.loop_count = 0;
        self.executed = 0;
        self.last_result = None;
        self.last_error = None;
        self.pass_progress = false;
        self.rested = false;
        self.push_log(String::from("restarted"));
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    /// Decides what to run at the current index.
    ///
    /// This is where end-of-queue and confirmation gating happen, so the
    /// state may change to `COMPLETED` or `WAITING_CONFIRM`, in which case
    /// [`NextStep::Idle`] is returned. In loop mode, a pass that neither
    /// executed nor slept is followed by [`NextStep::Rest`] before the queue
    /// wraps.
    pub fn next_step(&mut self) -> NextStep {
        if self.state != PlaybackState::Running {
            return NextStep::Idle;
        }

        if self.index >= self.queue.len() {
            if self.header.play_mode == PlayMode::Loop && !self.original.is_empty() {
                if !self.pass_progress && !self.rested {
                    return NextStep::Rest(self.idle_rest_ms());
                }
                self.queue.clone_from(&self.original);
                self.index = 0;
                self.loop_count += 1;
                if self.pass_progress {
                    self.epoch += 1;
                }
                self.pass_progress = false;
                self.rested = false;
                info!("Playback loop {} starting", self.loop_count);
            } else {
                self.set_state(PlaybackState::Completed);
                return NextStep::Idle;
            }
        }

        let Some(action) = self.queue.get(self.index) else {
            return NextStep::Idle;
        };

        if self.header.requires_confirmation(action) && !self.approved {
            self.set_state(PlaybackState::WaitingConfirm);
            return NextStep::Idle;
        }

        match action {
            RecordedAction::Sleep { time_ms } => NextStep::Sleep(*time_ms),
            RecordedAction::Edit { key, value } => NextStep::Write {
                key: key.clone(),
                value: Some(value.clone()),
            },
            RecordedAction::Delete { key } => NextStep::Write {
                key: key.clone(),
                value: None,
            },
            RecordedAction::Get { key } => NextStep::Read { key: key.clone() },
            RecordedAction::Exec(exec) => NextStep::Expand(exec.clone()),
        }
    }

    /// Applies the outcome of the step started from [`Self::next_step`].
    ///
    /// Outcomes that arrive after the session left `RUNNING` are discarded.
    pub fn complete_step(&mut self, outcome: StepOutcome) {
        if self.state != PlaybackState::Running {
            return;
        }
        self.approved = false;

        match outcome {
            StepOutcome::Expanded(actions) => {
                self.push_log(format!("exec expanded to {} action(s)", actions.len()));
                if !actions.is_empty() {
                    self.epoch += 1;
                }
                let end = (self.index + 1).min(self.queue.len());
                self.queue.splice(self.index..end, actions);
            }
            StepOutcome::Executed(message) => {
                self.push_log(message.clone());
                self.last_result = Some(message);
                self.last_error = None;
                self.executed += 1;
                self.index += 1;
                self.progressed();
            }
            StepOutcome::Slept => {
                self.index += 1;
                self.progressed();
            }
            StepOutcome::Rested => self.rested = true,
            StepOutcome::Failed(e) => {
                error!("Playback paused at action {}: {e}", self.index);
                self.push_log(format!("failed: {e}"));
                self.last_error = Some(e.to_string());
                self.set_state(PlaybackState::Paused);
            }
        }
    }

    fn progressed(&mut self) {
        self.pass_progress = true;
        self.epoch += 1;
    }

    const fn idle_rest_ms(&self) -> u64 {
        if self.header.auto_sleep_ms > 0 {
            self.header.auto_sleep_ms
        } else {
            IDLE_PASS_REST_MS
        }
    }

    fn require(&self, command: &'static str, allowed: &[PlaybackState]) -> Result<(), PlaybackError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTransition {
                command,
                state: self.state,
            })
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if state != self.state {
            info!("Playback {} -> {state} at action {}", self.state, self.index);
            self.state = state;
        }
        if state != PlaybackState::Running {
            self.approved = false;
        }
        self.epoch += 1;
    }

    fn push_log(&mut self, message: String) {
        if self.log.len() == MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(PlaybackLogEntry {
            at: Utc::now(),
            index: self.index,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::HeaderUpdate;
    use serde_json::json;

    fn recording(update: HeaderUpdate, actions: Vec<RecordedAction>) -> RecordingFile {
        let mut header = ActionHeader::default();
        header.apply(update);
        RecordingFile::new(header, actions)
    }

    fn unconfirmed(actions: Vec<RecordedAction>) -> PlaybackSession {
        PlaybackSession::new(recording(HeaderUpdate::default().confirm_actions(false), actions))
    }

    #[test]
    fn test_initial_state_and_invalid_commands() {
        let mut session = unconfirmed(vec![RecordedAction::get("/a")]);
        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(
            session.confirm(),
            Err(PlaybackError::InvalidTransition {
                command: "confirm",
                state: PlaybackState::Paused,
            })
        );
        assert!(session.pause().is_err());
        assert!(session.stop().is_err());
        assert!(session.restart().is_err());
        assert_eq!(session.next_step(), NextStep::Idle);
    }

    #[test]
    fn test_steps_advance_in_order() {
        let mut session = unconfirmed(vec![
            RecordedAction::edit("/a", json!(1)),
            RecordedAction::Sleep { time_ms: 10 },
            RecordedAction::delete("/b"),
        ]);
        session.start().expect("start");

        assert_eq!(
            session.next_step(),
            NextStep::Write { key: "/a".into(), value: Some(json!(1)) }
        );
        session.complete_step(StepOutcome::Executed("set /a".into()));
        assert_eq!(session.next_step(), NextStep::Sleep(10));
        session.complete_step(StepOutcome::Slept);
        assert_eq!(session.next_step(), NextStep::Write { key: "/b".into(), value: None });
        session.complete_step(StepOutcome::Executed("deleted /b".into()));

        assert_eq!(session.next_step(), NextStep::Idle);
        assert_eq!(session.state(), PlaybackState::Completed);
        assert_eq!(session.executed(), 2);
        assert_eq!(session.status().last_result.as_deref(), Some("deleted /b"));
    }

    #[test]
    fn test_confirmation_gate() {
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default(),
            vec![
                RecordedAction::get("/a"),
                RecordedAction::edit("/a", json!(2)),
                RecordedAction::delete("/a"),
            ],
        ));
        session.start().expect("start");

        // gets are never gated
        assert_eq!(session.next_step(), NextStep::Read { key: "/a".into() });
        session.complete_step(StepOutcome::Executed("/a = 1".into()));

        assert_eq!(session.next_step(), NextStep::Idle);
        assert_eq!(session.state(), PlaybackState::WaitingConfirm);
        assert_eq!(session.index(), 1);

        session.confirm().expect("confirm");
        assert_eq!(
            session.next_step(),
            NextStep::Write { key: "/a".into(), value: Some(json!(2)) }
        );
        session.complete_step(StepOutcome::Executed("set /a".into()));
        assert_eq!(session.index(), 2);

        assert_eq!(session.next_step(), NextStep::Idle);
        assert_eq!(session.state(), PlaybackState::WaitingConfirm);
        session.decline().expect("decline");
        assert_eq!(session.index(), 3);
        assert_eq!(session.state(), PlaybackState::Running);
        assert_eq!(session.executed(), 2);
    }

    #[test]
    fn test_exec_splice_keeps_index() {
        let exec = ExecAction::new("/users", "true", "('DELETE', key)");
        let mut session = unconfirmed(vec![
            RecordedAction::Exec(exec.clone()),
            RecordedAction::get("/after"),
        ]);
        session.start().expect("start");

        assert_eq!(session.next_step(), NextStep::Expand(exec));
        session.complete_step(StepOutcome::Expanded(vec![
            RecordedAction::delete("/users/a"),
            RecordedAction::delete("/users/b"),
        ]));
        assert_eq!(session.index(), 0);
        assert_eq!(
            session.queue(),
            &[
                RecordedAction::delete("/users/a"),
                RecordedAction::delete("/users/b"),
                RecordedAction::get("/after"),
            ]
        );
    }

    #[test]
    fn test_empty_expansion_moves_to_next_action() {
        let exec = ExecAction::new("/none", "true", "('DELETE', key)");
        let mut session = unconfirmed(vec![RecordedAction::Exec(exec), RecordedAction::get("/x")]);
        session.start().expect("start");
        let _ = session.next_step();
        session.complete_step(StepOutcome::Expanded(Vec::new()));
        assert_eq!(session.next_step(), NextStep::Read { key: "/x".into() });
    }

    #[test]
    fn test_loop_resets_queue_and_counts_passes() {
        let exec = ExecAction::new("/users", "true", "('DELETE', key)");
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default().confirm_actions(false).play_mode(PlayMode::Loop),
            vec![RecordedAction::Exec(exec.clone())],
        ));
        session.start().expect("start");

        let _ = session.next_step();
        session.complete_step(StepOutcome::Expanded(vec![RecordedAction::delete("/users/a")]));
        let _ = session.next_step();
        session.complete_step(StepOutcome::Executed("deleted /users/a".into()));

        assert_eq!(session.next_step(), NextStep::Expand(exec.clone()));
        assert_eq!(session.loop_count(), 1);
        assert_eq!(session.queue(), &[RecordedAction::Exec(exec)]);
        assert_eq!(session.state(), PlaybackState::Running);
    }

    #[test]
    fn test_idle_loop_pass_rests_before_wrapping() {
        let exec = ExecAction::new("/missing", "true", "('DELETE', key)");
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default().confirm_actions(false).play_mode(PlayMode::Loop),
            vec![RecordedAction::Exec(exec.clone())],
        ));
        session.start().expect("start");
        let epoch = session.epoch();

        assert_eq!(session.next_step(), NextStep::Expand(exec.clone()));
        session.complete_step(StepOutcome::Expanded(Vec::new()));
        assert_eq!(session.next_step(), NextStep::Rest(IDLE_PASS_REST_MS));
        assert_eq!(session.next_step(), NextStep::Rest(IDLE_PASS_REST_MS));
        assert_eq!(session.loop_count(), 0);

        session.complete_step(StepOutcome::Rested);
        assert_eq!(session.next_step(), NextStep::Expand(exec));
        assert_eq!(session.loop_count(), 1);
        assert_eq!(session.epoch(), epoch);
    }

    #[test]
    fn test_idle_rest_uses_auto_sleep() {
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default()
                .confirm_actions(false)
                .play_mode(PlayMode::Loop)
                .auto_sleep_ms(250),
            vec![RecordedAction::Exec(ExecAction::new("/x", "true", "('DELETE', key)"))],
        ));
        session.start().expect("start");
        let _ = session.next_step();
        session.complete_step(StepOutcome::Expanded(Vec::new()));
        assert_eq!(session.next_step(), NextStep::Rest(250));
    }

    #[test]
    fn test_loop_over_empty_recording_completes() {
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default().play_mode(PlayMode::Loop),
            Vec::new(),
        ));
        session.start().expect("start");
        assert_eq!(session.next_step(), NextStep::Idle);
        assert_eq!(session.state(), PlaybackState::Completed);
    }

    #[test]
    fn test_store_failure_pauses_without_advancing() {
        let mut session = unconfirmed(vec![RecordedAction::edit("/a", json!(1))]);
        session.start().expect("start");
        let _ = session.next_step();
        session.complete_step(StepOutcome::Failed(StoreError::transport("/a", "offline")));

        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(session.index(), 0);
        assert!(session.status().last_error.is_some_and(|e| e.contains("offline")));

        session.start().expect("retry");
        let _ = session.next_step();
        session.complete_step(StepOutcome::Executed("set /a".into()));
        assert_eq!(session.status().last_error, None);
    }

    #[test]
    fn test_skip_is_clamped() {
        let mut session = unconfirmed(vec![RecordedAction::get("/a"), RecordedAction::get("/b")]);
        session.skip().expect("skip");
        assert_eq!(session.index(), 1);
        session.skip().expect("skip");
        assert_eq!(session.index(), 1);

        let mut empty = unconfirmed(Vec::new());
        empty.skip().expect("skip");
        assert_eq!(empty.index(), 0);
    }

    #[test]
    fn test_timeout_only_from_watched_states() {
        let mut session = PlaybackSession::new(recording(
            HeaderUpdate::default(),
            vec![RecordedAction::delete("/a")],
        ));
        assert!(!session.timeout());

        session.start().expect("start");
        let _ = session.next_step();
        assert_eq!(session.state(), PlaybackState::WaitingConfirm);
        assert!(session.timeout());
        assert_eq!(session.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_restart_resets_everything() {
        let exec = ExecAction::new("/users", "true", "('DELETE', key)");
        let mut session = unconfirmed(vec![RecordedAction::Exec(exec.clone())]);
        session.start().expect("start");
        let _ = session.next_step();
        session.complete_step(StepOutcome::Expanded(vec![RecordedAction::delete("/users/a")]));
        session.stop().expect("stop");

        session.restart().expect("restart");
        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(session.index(), 0);
        assert_eq!(session.loop_count(), 0);
        assert_eq!(session.queue(), &[RecordedAction::Exec(exec)]);
    }

    #[test]
    fn test_late_outcome_is_discarded() {
        let mut session = unconfirmed(vec![RecordedAction::edit("/a", json!(1))]);
        session.start().expect("start");
        let _ = session.next_step();
        session.pause().expect("pause");
        session.complete_step(StepOutcome::Executed("set /a".into()));
        assert_eq!(session.index(), 0);
        assert_eq!(session.executed(), 0);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut session = unconfirmed(vec![RecordedAction::get("/a"), RecordedAction::get("/b")]);
        for _ in 0..(MAX_LOG_ENTRIES + 10) {
            session.skip().expect("skip");
        }
        assert_eq!(session.log().count(), MAX_LOG_ENTRIES);
    }
}
