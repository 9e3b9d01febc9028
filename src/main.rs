//! Treeplay CLI entrypoint.
//!
//! This is the main entrypoint for the treeplay command-line tool.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use treeplay::cli::{Cli, Commands, OutputFormatter, RecordCommands};
use treeplay::config::{ConfigParser, ConfigValidator, StoreBackend, ToolConfig};
use treeplay::diff::DiffReview;
use treeplay::error::{PlaybackError, Result, TreeplayError};
use treeplay::exec::{CompiledExec, ExecInterpreter};
use treeplay::playback::{PlaybackEngine, PlaybackHandle, PlaybackState, PlaybackStatus};
use treeplay::recording::{
    ExecAction, HeaderUpdate, RecordingFile, RecordingSession, RecordingStorage,
};
use treeplay::store::{JsonFileStore, MemoryStore, TreeEditor, TreeStore};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type Prompt = Lines<BufReader<Stdin>>;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    init_logging(&config.logging.level, cli.verbose);

    if let Err(e) = ConfigValidator::new().validate(&config) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over `--verbose`, which wins over the configured level.
fn init_logging(level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `.env` and the tool configuration.
fn load_config(explicit: Option<&Path>) -> Result<ToolConfig> {
    let base = explicit
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;
    parser.resolve(explicit)
}

/// Main async entry point.
async fn run(cli: Cli, config: ToolConfig) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let store = open_store(&config)?;

    match cli.command {
        Commands::Get { key, record } => {
            cmd_get(store.as_ref(), &key, record.as_deref(), &config, &formatter).await
        }
        Commands::Set { key, value, record } => {
            cmd_set(store.as_ref(), &key, &value, record.as_deref(), &config, &formatter).await
        }
        Commands::Delete { key, record } => {
            cmd_delete(store.as_ref(), &key, record.as_deref(), &config, &formatter).await
        }
        Commands::Diff {
            original,
            modified,
            export,
        } => cmd_diff(&original, &modified, export.as_deref(), &formatter).await,
        Commands::Apply {
            original,
            modified,
            path,
            exclude,
            yes,
        } => {
            cmd_apply(store.as_ref(), &original, &modified, &path, &exclude, yes, &formatter).await
        }
        Commands::Record { command } => cmd_record(command, &config, &formatter).await,
        Commands::Expand {
            path,
            target,
            action,
        } => cmd_expand(store.as_ref(), ExecAction::new(path, target, action), &formatter).await,
        Commands::Play { file, yes } => cmd_play(store, &file, yes, &formatter).await,
    }
}

/// Read a key.
async fn cmd_get(
    store: &dyn TreeStore,
    key: &str,
    record: Option<&Path>,
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut session = open_session(record, config).await?;
    let value = TreeEditor::new(store).get(&mut session, key).await?;
    println!("{}", formatter.format_value(key, value.as_ref()));
    close_session(record, session).await
}

/// Write a key.
async fn cmd_set(
    store: &dyn TreeStore,
    key: &str,
    value: &str,
    record: Option<&Path>,
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut session = open_session(record, config).await?;
    TreeEditor::new(store).set_json(&mut session, key, value).await?;
    eprintln!("{}", formatter.success(&format!("set {key}")));
    close_session(record, session).await
}

/// Delete a key.
async fn cmd_delete(
    store: &dyn TreeStore,
    key: &str,
    record: Option<&Path>,
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut session = open_session(record, config).await?;
    TreeEditor::new(store).delete(&mut session, key).await?;
    eprintln!("{}", formatter.success(&format!("deleted {key}")));
    close_session(record, session).await
}

/// Show the diff between two documents.
async fn cmd_diff(
    original: &Path,
    modified: &Path,
    export: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let storage = RecordingStorage::new();
    let before = storage.read_json(original).await?;
    let after = storage.read_json(modified).await?;

    let review = DiffReview::compute("/", &before, &after);
    println!("{}", formatter.format_diff(&review));

    if let Some(export) = export {
        storage.write_json(export, &review.export_json()).await?;
        eprintln!(
            "{}",
            formatter.success(&format!("Diff written to {}", export.display()))
        );
    }

    Ok(())
}

/// Apply the diff between two documents to the store.
async fn cmd_apply(
    store: &dyn TreeStore,
    original: &Path,
    modified: &Path,
    base_path: &str,
    exclude: &[usize],
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let storage = RecordingStorage::new();
    let before = storage.read_json(original).await?;
    let after = storage.read_json(modified).await?;

    let mut review = DiffReview::compute(base_path, &before, &after);
    for index in exclude.iter().copied().collect::<BTreeSet<_>>() {
        review.toggle(index)?;
    }

    println!("{}", formatter.format_diff(&review));

    if review.selected().next().is_none() {
        eprintln!("No changes to apply.");
        return Ok(());
    }

    // Confirm
    if !auto_approve && !ask_yes_no(&format!("Apply these changes to {base_path}?"))? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let report = review.apply(store).await?;
    println!("{}", formatter.format_apply(&report));
    Ok(())
}

/// Recording file management.
async fn cmd_record(
    command: RecordCommands,
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<()> {
    let storage = RecordingStorage::new();

    match command {
        RecordCommands::New {
            file,
            play_mode,
            confirm,
            auto_sleep_ms,
            timeout,
            force,
        } => {
            if !force && storage.exists(&file) {
                eprintln!("Recording already exists: {}", file.display());
                eprintln!("Use --force to overwrite.");
                return Ok(());
            }

            let mut header = config.recording.header();
            header.apply(HeaderUpdate {
                play_mode,
                confirm_actions: confirm,
                auto_sleep_ms,
                timeout_seconds: timeout,
            });

            storage
                .save(&file, &RecordingFile::new(header, Vec::new()))
                .await?;
            eprintln!(
                "{}",
                formatter.success(&format!("Created {}", file.display()))
            );
        }
        RecordCommands::Exec {
            file,
            path,
            target,
            action,
        } => {
            let exec = ExecAction::new(path, target, action);
            CompiledExec::compile(&exec)?;

            let mut session = RecordingSession::resume(storage.load(&file).await?);
            session.record_exec(exec);
            storage.save(&file, &session.stop()).await?;
        }
        RecordCommands::Sleep { file, ms } => {
            let mut session = RecordingSession::resume(storage.load(&file).await?);
            session.record_sleep(ms);
            storage.save(&file, &session.stop()).await?;
        }
        RecordCommands::Show { file } => {
            let recording = storage.load(&file).await?;
            println!("{}", formatter.format_recording(&recording));
        }
    }

    Ok(())
}

/// Preview an exec against the current store contents.
async fn cmd_expand(
    store: &dyn TreeStore,
    exec: ExecAction,
    formatter: &OutputFormatter,
) -> Result<()> {
    // Surface expression errors instead of an empty preview
    CompiledExec::compile(&exec)?;

    let actions = ExecInterpreter::new().expand(store, &exec).await?;
    println!("{}", formatter.format_actions(&actions));
    Ok(())
}

/// Replay a recording.
async fn cmd_play(
    store: Arc<dyn TreeStore>,
    file: &Path,
    auto_confirm: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let recording = RecordingStorage::new().load(file).await?;
    info!(
        "Playing {} actions ({} mutations) against the {} store",
        recording.actions.len(),
        recording.mutation_count(),
        store.backend_type()
    );

    let mut handle = PlaybackEngine::spawn(store, recording);
    let mut prompt = BufReader::new(tokio::io::stdin()).lines();
    handle.start().await?;

    loop {
        let status = tokio::select! {
            status = handle.wait_for_operator() => Some(status?),
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(status) = status else {
            warn!("Interrupted; stopping playback");
            let _ = handle.stop().await;
            continue;
        };

        match status.state {
            PlaybackState::Completed | PlaybackState::Stopped => break,
            PlaybackState::Running => {}
            PlaybackState::WaitingConfirm => {
                eprintln!("{}", formatter.format_status(&status));
                let choice = if auto_confirm {
                    'y'
                } else {
                    ask(&mut prompt, "Run this action? [y]es / [n]o / [q]uit: ").await?
                };
                let result = match choice {
                    'y' => handle.confirm().await,
                    'n' => handle.decline().await,
                    _ => handle.stop().await,
                };
                tolerate_race(result)?;
            }
            PlaybackState::Paused => {
                if !handle_pause(&handle, &mut prompt, &status, formatter).await? {
                    break;
                }
            }
        }
    }

    let session = handle.shutdown().await?;
    eprint!("{}", formatter.format_log(session.log()));
    println!("{}", formatter.format_status(&session.status()));
    Ok(())
}

/// Asks the operator how to continue after playback paused.
///
/// Returns false if the operator chose to quit.
async fn handle_pause(
    handle: &PlaybackHandle,
    prompt: &mut Prompt,
    status: &PlaybackStatus,
    formatter: &OutputFormatter,
) -> Result<bool> {
    eprintln!("{}", formatter.format_status(status));
    if status.last_error.is_none() {
        tolerate_race(handle.start().await)?;
        return Ok(true);
    }

    let choice = ask(prompt, "Playback paused. [r]etry / [s]kip / [q]uit: ").await?;
    let result = match choice {
        'r' => handle.start().await,
        's' => match handle.skip().await {
            Ok(_) => handle.start().await,
            Err(e) => Err(e),
        },
        _ => return Ok(false),
    };
    tolerate_race(result)?;
    Ok(true)
}

/// Ignores commands that lost a race with the engine (e.g. the watchdog
/// stopped playback while the prompt was open).
fn tolerate_race(result: std::result::Result<PlaybackStatus, PlaybackError>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e @ PlaybackError::InvalidTransition { .. }) => {
            warn!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Creates the store selected by the configuration.
fn open_store(config: &ToolConfig) -> Result<Arc<dyn TreeStore>> {
    let store: Arc<dyn TreeStore> = match config.store.backend {
        StoreBackend::Memory => {
            debug!("Using in-memory store; changes are discarded on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File => {
            let path = config
                .store
                .path
                .as_ref()
                .ok_or_else(|| TreeplayError::internal("File store path not configured"))?;
            Arc::new(JsonFileStore::new(path))
        }
    };
    Ok(store)
}

/// Opens the recording a store command appends to.
///
/// Without a file the session stays inactive and records nothing. A missing
/// file starts a new recording with the configured header defaults.
async fn open_session(record: Option<&Path>, config: &ToolConfig) -> Result<RecordingSession> {
    let Some(file) = record else {
        return Ok(RecordingSession::new());
    };

    let storage = RecordingStorage::new();
    if storage.exists(file) {
        return Ok(RecordingSession::resume(storage.load(file).await?));
    }

    let defaults = config.recording.header();
    let mut session = RecordingSession::new();
    session.start();
    session.configure(
        HeaderUpdate::default()
            .play_mode(defaults.play_mode)
            .confirm_actions(defaults.confirm_actions)
            .auto_sleep_ms(defaults.auto_sleep_ms)
            .timeout_seconds(defaults.timeout_seconds),
    )?;
    Ok(session)
}

/// Saves the recording opened by [`open_session`].
async fn close_session(record: Option<&Path>, mut session: RecordingSession) -> Result<()> {
    if let Some(file) = record {
        RecordingStorage::new().save(file, &session.stop()).await?;
    }
    Ok(())
}

/// Prompts on stderr and returns the first character of the answer,
/// lowercased. End of input and Ctrl-C count as `q`.
async fn ask(prompt: &mut Prompt, question: &str) -> Result<char> {
    eprint!("{question}");
    std::io::stderr().flush()?;
    read_choice(prompt, tokio::signal::ctrl_c()).await
}

/// Reads one answer line, giving up with `q` when `interrupt` fires first.
async fn read_choice<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<char> {
    let answer = tokio::select! {
        line = lines.next_line() => line?.unwrap_or_default(),
        _ = interrupt => {
            eprintln!();
            warn!("Interrupted at prompt");
            String::new()
        }
    };
    Ok(answer
        .trim()
        .chars()
        .next()
        .map_or('q', |c| c.to_ascii_lowercase()))
}

/// Blocking yes/no confirmation.
fn ask_yes_no(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
