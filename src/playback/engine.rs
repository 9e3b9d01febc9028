//! Async playback driver.
//!
//! A [`PlaybackEngine`] task owns the [`PlaybackSession`] and is the only
//! code that mutates it. Operator commands, step completions, the pacing
//! delay, and the watchdog all arrive as events in one `select!` loop, so a
//! watchdog expiry and an action completion can never interleave. Leaving
//! `RUNNING` drops the in-flight step future, which cancels sleeps and
//! discards half-finished exec expansions before they touch the queue.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::exec::ExecInterpreter;
use crate::recording::RecordingFile;
use crate::store::TreeStore;

use super::session::{NextStep, PlaybackSession, PlaybackState, PlaybackStatus, StepOutcome};

const COMMAND_BUFFER: usize = 16;

type StepFuture = Pin<Box<dyn Future<Output = StepOutcome> + Send>>;
type Reply = oneshot::Sender<Result<PlaybackStatus, PlaybackError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Pause,
    Stop,
    Confirm,
    Decline,
    Skip,
    Restart,
    Shutdown,
}

#[derive(Debug)]
struct Request {
    command: Command,
    reply: Reply,
}

/// Drives a [`PlaybackSession`] against a store.
pub struct PlaybackEngine<S: TreeStore + ?Sized + 'static> {
    session: PlaybackSession,
    store: Arc<S>,
    commands: mpsc::Receiver<Request>,
    status: watch::Sender<PlaybackStatus>,
    step: Option<StepFuture>,
    pacing: Option<Instant>,
    watchdog: Option<Instant>,
    armed_epoch: Option<u64>,
}

/// Control surface for a running [`PlaybackEngine`].
#[derive(Debug)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<Request>,
    status: watch::Receiver<PlaybackStatus>,
    task: JoinHandle<PlaybackSession>,
}

impl<S: TreeStore + ?Sized + 'static> PlaybackEngine<S> {
    /// Spawns an engine for `recording` in the paused state.
    #[must_use]
    pub fn spawn(store: Arc<S>, recording: RecordingFile) -> PlaybackHandle {
        let session = PlaybackSession::new(recording);
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (status, status_rx) = watch::channel(session.status());

        let engine = Self {
            session,
            store,
            commands,
            status,
            step: None,
            pacing: None,
            watchdog: None,
            armed_epoch: None,
        };
        let task = tokio::spawn(engine.run());

        PlaybackHandle {
            commands: commands_tx,
            status: status_rx,
            task,
        }
    }

    async fn run(mut self) -> PlaybackSession {
        loop {
            self.advance();
            self.rearm_watchdog();
            self.publish();

            tokio::select! {
                biased;

                request = self.commands.recv() => {
                    let Some(Request { command, reply }) = request else {
                        debug!("All playback handles dropped");
                        break;
                    };
                    if command == Command::Shutdown {
                        let _ = reply.send(Ok(self.session.status()));
                        break;
                    }
                    let result = self.handle(command);
                    let _ = reply.send(result);
                }
                () = wait_until(self.watchdog) => {
                    self.watchdog = None;
                    if self.session.timeout() {
                        warn!(
                            "Playback timed out after {}s without progress",
                            self.session.header().timeout_seconds
                        );
                        self.cancel_step();
                    }
                }
                outcome = next_outcome(&mut self.step) => {
                    self.step = None;
                    let executed = matches!(outcome, StepOutcome::Executed(_));
                    self.session.complete_step(outcome);
                    let pause = self.session.header().auto_sleep_ms;
                    if executed && pause > 0 {
                        self.pacing = Some(Instant::now() + Duration::from_millis(pause));
                    }
                }
                () = wait_until(self.pacing) => {
                    self.pacing = None;
                }
            }
        }

        self.publish();
        self.session
    }

    fn handle(&mut self, command: Command) -> Result<PlaybackStatus, PlaybackError> {
        let result = match command {
            Command::Start => self.session.start(),
            Command::Pause => self.session.pause(),
            Command::Stop => self.session.stop(),
            Command::Confirm => self.session.confirm(),
            Command::Decline => self.session.decline(),
            Command::Skip => self.session.skip(),
            Command::Restart => self.session.restart(),
            Command::Shutdown => Ok(()),
        };
        if result.is_ok() {
            self.cancel_step();
            self.advance();
            self.rearm_watchdog();
            self.publish();
        }
        result.map(|()| self.session.status())
    }

    /// Starts the next step if the session is running and nothing is in
    /// flight.
    fn advance(&mut self) {
        if self.step.is_some() || self.pacing.is_some() {
            return;
        }
        let store = Arc::clone(&self.store);
        self.step = match self.session.next_step() {
            NextStep::Idle => None,
            NextStep::Sleep(ms) => boxed(async move {
                sleep(Duration::from_millis(ms)).await;
                StepOutcome::Slept
            }),
            NextStep::Rest(ms) => boxed(async move {
                sleep(Duration::from_millis(ms)).await;
                StepOutcome::Rested
            }),
            NextStep::Write { key, value } => boxed(async move {
                let deleting = value.is_none();
                match store.write(&key, value).await {
                    Ok(()) if deleting => StepOutcome::Executed(format!("deleted {key}")),
                    Ok(()) => StepOutcome::Executed(format!("set {key}")),
                    Err(e) => StepOutcome::Failed(e),
                }
            }),
            NextStep::Read { key } => boxed(async move {
                match store.read(&key).await {
                    Ok(Some(value)) => StepOutcome::Executed(format!("{key} = {value}")),
                    Ok(None) => StepOutcome::Executed(format!("{key} is empty")),
                    Err(e) => StepOutcome::Failed(e),
                }
            }),
            NextStep::Expand(exec) => boxed(async move {
                match ExecInterpreter::new().expand(store.as_ref(), &exec).await {
                    Ok(actions) => StepOutcome::Expanded(actions),
                    Err(e) => StepOutcome::Failed(e),
                }
            }),
        };
    }

    fn cancel_step(&mut self) {
        if self.step.take().is_some() {
            debug!("Cancelled in-flight step at action {}", self.session.index());
        }
        self.pacing = None;
    }

    /// Restarts the watchdog whenever the session epoch moved, which happens
    /// on every state transition and on every completed step that made
    /// progress, so a long recording that keeps executing is never cut off.
    /// Idle loop passes and empty expansions do not rearm it.
    fn rearm_watchdog(&mut self) {
        let epoch = self.session.epoch();
        if self.armed_epoch == Some(epoch) {
            return;
        }
        self.armed_epoch = Some(epoch);

        let secs = self.session.header().timeout_seconds;
        self.watchdog = (self.session.state().is_watched() && secs > 0)
            .then(|| Instant::now() + Duration::from_secs(secs));
    }

    fn publish(&self) {
        let next = self.session.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

fn boxed(step: impl Future<Output = StepOutcome> + Send + 'static) -> Option<StepFuture> {
    Some(Box::pin(step))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_outcome(step: &mut Option<StepFuture>) -> StepOutcome {
    match step {
        Some(step) => step.await,
        None => pending().await,
    }
}

impl PlaybackHandle {
    /// Returns the latest status.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    /// Starts or resumes playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless paused, or
    /// [`PlaybackError::EngineGone`] if the engine has exited.
    pub async fn start(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Start).await
    }

    /// Pauses a running playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless running.
    pub async fn pause(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Pause).await
    }

    /// Stops playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless running or waiting
    /// for confirmation.
    pub async fn stop(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Stop).await
    }

    /// Executes the held action.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless waiting for
    /// confirmation.
    pub async fn confirm(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Confirm).await
    }

    /// Skips the held action.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless waiting for
    /// confirmation.
    pub async fn decline(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Decline).await
    }

    /// Skips the current action.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless paused or running.
    pub async fn skip(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Skip).await
    }

    /// Resets a finished playback to the start of the recording.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTransition`] unless completed or
    /// stopped.
    pub async fn restart(&self) -> Result<PlaybackStatus, PlaybackError> {
        self.send(Command::Restart).await
    }

    /// Waits until the status satisfies `predicate` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EngineGone`] if the engine exits first.
    pub async fn wait_until(
        &mut self,
        predicate: impl FnMut(&PlaybackStatus) -> bool,
    ) -> Result<PlaybackStatus, PlaybackError> {
        self.status
            .wait_for(predicate)
            .await
            .map(|status| status.clone())
            .map_err(|_| PlaybackError::EngineGone)
    }

    /// Waits for one of the states that need the operator or end playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EngineGone`] if the engine exits first.
    pub async fn wait_for_operator(&mut self) -> Result<PlaybackStatus, PlaybackError> {
        self.wait_until(|s| s.state != PlaybackState::Running).await
    }

    /// Stops the engine task and returns the final session.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EngineGone`] if the task panicked.
    pub async fn shutdown(self) -> Result<PlaybackSession, PlaybackError> {
        let (reply, _) = oneshot::channel();
        let _ = self
            .commands
            .send(Request {
                command: Command::Shutdown,
                reply,
            })
            .await;
        self.task.await.map_err(|_| PlaybackError::EngineGone)
    }

    async fn send(&self, command: Command) -> Result<PlaybackStatus, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| PlaybackError::EngineGone)?;
        response.await.map_err(|_| PlaybackError::EngineGone)?
    }
}
