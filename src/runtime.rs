//! Terminal lifecycle, the profile picker loop and the per-session event loop.

use color_eyre::eyre::{eyre, Result, WrapErr};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use crate::app::{App, AppAction, BackendAction, ConnectionInfo, QueryTarget, SessionExit};
use crate::assist::SqlAssistant;
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::connection;
use crate::db::models::{ActiveProcess, HomeSnapshot, TabularRows};
use crate::db::queries;
use crate::event::{AppEvent, EventHandler};
use crate::picker::{Picker, PickerOutcome};
use crate::profiles::{ConnectionProfile, ServiceFile};
use crate::store::{default_queries, import_sql_dir, FileStore, MemoryStore, QueryStore};
use crate::ui::{self, theme};

const EVENT_POLL: Duration = Duration::from_millis(10);

enum DbCommand {
    Execute { generation: u64, target: QueryTarget },
    Backend { pid: i32, action: BackendAction },
}

enum DbResult {
    Connected {
        ssl_mode: &'static str,
        server_version: Option<String>,
    },
    Query {
        generation: u64,
        result: Result<TabularRows, String>,
    },
    Home {
        generation: u64,
        result: Result<HomeSnapshot, String>,
    },
    Active {
        generation: u64,
        result: Result<Vec<ActiveProcess>, String>,
    },
    Backend {
        pid: i32,
        action: BackendAction,
        result: Result<(), String>,
    },
    Generated {
        request: u64,
        result: Result<String, String>,
    },
    Clipboard(Result<(), String>),
}

impl DbCommand {
    /// The completion reported when no client could be obtained.
    fn failed(self, error: String) -> DbResult {
        match self {
            Self::Execute { generation, target } => match target {
                QueryTarget::Home => DbResult::Home {
                    generation,
                    result: Err(error),
                },
                QueryTarget::Active => DbResult::Active {
                    generation,
                    result: Err(error),
                },
                QueryTarget::Sql(_) => DbResult::Query {
                    generation,
                    result: Err(error),
                },
            },
            Self::Backend { pid, action } => DbResult::Backend {
                pid,
                action,
                result: Err(error),
            },
        }
    }
}

impl DbResult {
    fn is_failure(&self) -> bool {
        match self {
            Self::Query { result, .. } => result.is_err(),
            Self::Home { result, .. } => result.is_err(),
            Self::Active { result, .. } => result.is_err(),
            Self::Backend { result, .. } => result.is_err(),
            Self::Connected { .. } | Self::Generated { .. } | Self::Clipboard(_) => false,
        }
    }
}

/// Owns the session's database connection. Commands run one at a time.
struct Worker {
    profile: ConnectionProfile,
    client: Option<Arc<Client>>,
    /// Set after a failed command; the next one pings before reusing the client.
    suspect: bool,
    results: mpsc::UnboundedSender<DbResult>,
}

impl Worker {
    fn new(profile: ConnectionProfile, results: mpsc::UnboundedSender<DbResult>) -> Self {
        Self {
            profile,
            client: None,
            suspect: false,
            results,
        }
    }

    async fn client(&mut self) -> Result<Arc<Client>, String> {
        if self.client.as_ref().is_some_and(|c| c.is_closed()) {
            warn!(profile = %self.profile.name, "connection closed, reconnecting");
            self.client = None;
        }
        if std::mem::take(&mut self.suspect) {
            if let Some(client) = &self.client {
                if let Err(e) = queries::ping(client).await {
                    warn!(error = %e, "connection check failed, reconnecting");
                    self.client = None;
                }
            }
        }
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }

        let (client, mode) = connection::connect(&self.profile)
            .await
            .map_err(|e| format!("Connection failed: {e}"))?;
        let server_version = match queries::fetch_server_info(&client).await {
            Ok(info) => Some(info.version),
            Err(e) => {
                debug!(error = %e, "could not read server version");
                None
            }
        };
        // The receiver only disappears when the session is over.
        let _ = self.results.send(DbResult::Connected {
            ssl_mode: mode.label(),
            server_version,
        });
        let client = Arc::new(client);
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn handle(&mut self, cmd: DbCommand) -> DbResult {
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => return cmd.failed(e),
        };
        let result = match cmd {
            DbCommand::Execute { generation, target } => match target {
                QueryTarget::Home => DbResult::Home {
                    generation,
                    result: queries::fetch_home(&client).await.map_err(|e| e.to_string()),
                },
                QueryTarget::Active => DbResult::Active {
                    generation,
                    result: queries::fetch_active_processes(&client)
                        .await
                        .map_err(|e| e.to_string()),
                },
                QueryTarget::Sql(sql) => DbResult::Query {
                    generation,
                    result: queries::execute_sql(&client, &sql)
                        .await
                        .map_err(|e| e.to_string()),
                },
            },
            DbCommand::Backend { pid, action } => {
                let result = match action {
                    BackendAction::Cancel => queries::cancel_backend(&client, pid).await,
                    BackendAction::Terminate => queries::terminate_backend(&client, pid).await,
                };
                DbResult::Backend {
                    pid,
                    action,
                    result: result.map_err(|e| e.to_string()),
                }
            }
        };
        self.suspect = result.is_failure();
        result
    }
}

/// Process-wide settings shared by every session.
struct Context {
    config: AppConfig,
    store_path: Option<PathBuf>,
    assistant: Option<SqlAssistant>,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load();
    theme::set_theme(config.color_theme.colors());

    let store_path = cli.store_path(&config);
    if prepare_store(&cli, store_path.as_deref())? {
        return Ok(());
    }

    let service_file = cli
        .service_file_path()
        .ok_or_else(|| eyre!("could not locate the home directory, pass --service-file"))?;

    let assistant = match SqlAssistant::from_env(config.assist.clone()) {
        Ok(assistant) => Some(assistant),
        Err(e) => {
            warn!(error = %e, "SQL generation disabled");
            None
        }
    };
    let ctx = Context {
        config,
        store_path,
        assistant,
    };

    let mut terminal = enter_terminal()?;
    let mut events = EventHandler::new(EVENT_POLL);
    let outcome = drive(
        &mut terminal,
        &mut events,
        &ctx,
        &service_file,
        cli.profile_name().map(str::to_string),
    )
    .await;
    leave_terminal();
    outcome
}

/// Handle `--export`, `--import` and `--import-sql-dir`. Returns true when the program should exit.
fn prepare_store(cli: &Cli, store_path: Option<&Path>) -> Result<bool> {
    if cli.export.is_none() && cli.import.is_none() && cli.import_sql_dir.is_none() {
        return Ok(false);
    }
    let path = store_path.ok_or_else(|| eyre!("no query store location, pass --store"))?;
    let mut store = FileStore::open(path)
        .wrap_err_with(|| format!("opening query store {}", path.display()))?;

    if let Some(target) = &cli.export {
        let count = store
            .export_all(target)
            .wrap_err_with(|| format!("exporting queries to {}", target.display()))?;
        println!("Exported {count} queries to {}", target.display());
        return Ok(true);
    }
    if let Some(source) = &cli.import {
        let count = store
            .import_all(source)
            .wrap_err_with(|| format!("importing queries from {}", source.display()))?;
        info!(count, source = %source.display(), "imported query snapshot");
    }
    if let Some(dir) = &cli.import_sql_dir {
        let count = import_sql_dir(&mut store, dir)
            .wrap_err_with(|| format!("importing SQL files from {}", dir.display()))?;
        info!(count, dir = %dir.display(), "imported legacy SQL files");
    }
    Ok(false)
}

/// Alternate between the picker and sessions until the user quits.
async fn drive(
    terminal: &mut DefaultTerminal,
    events: &mut EventHandler,
    ctx: &Context,
    service_file: &Path,
    mut requested: Option<String>,
) -> Result<()> {
    let mut notice = None;
    loop {
        let name = match requested.take() {
            Some(name) => name,
            None => match pick_profile(terminal, events, service_file, notice.take()).await? {
                Some(name) => name,
                None => return Ok(()),
            },
        };

        let profile = match ServiceFile::load(service_file).and_then(|file| file.resolve(&name)) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(profile = %name, error = %e, "could not resolve profile");
                notice = Some(e.to_string());
                continue;
            }
        };

        match run_session(terminal, events, ctx, profile).await? {
            SessionExit::Quit => return Ok(()),
            SessionExit::SwitchProfile => info!("returning to the profile picker"),
        }
    }
}

async fn pick_profile(
    terminal: &mut DefaultTerminal,
    events: &mut EventHandler,
    service_file: &Path,
    notice: Option<String>,
) -> Result<Option<String>> {
    let mut picker = Picker::load(service_file);
    if notice.is_some() {
        picker.error = notice;
    }

    loop {
        terminal.draw(|frame| ui::render_picker(frame, &picker))?;

        let outcome = match events.next().await {
            Some(AppEvent::Key(key)) => picker.handle_key(key),
            Some(AppEvent::Mouse(mouse)) => picker.handle_mouse(mouse),
            Some(AppEvent::Resize(..)) => PickerOutcome::Continue,
            None => PickerOutcome::Quit,
        };

        match outcome {
            PickerOutcome::Continue => {}
            PickerOutcome::Select(name) => return Ok(Some(name)),
            PickerOutcome::Quit => return Ok(None),
            PickerOutcome::EditFile => {
                let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
                let mut parts = editor.split_whitespace();
                let mut command = Command::new(parts.next().unwrap_or("vi"));
                command.args(parts).arg(&picker.path);
                info!(editor = %editor, path = %picker.path.display(), "editing profile file");
                match run_outside_tui(terminal, events, &mut command).await? {
                    Ok(()) => picker.reload(),
                    Err(e) => {
                        picker.reload();
                        picker.error = Some(format!("Editor failed: {e}"));
                    }
                }
            }
        }
    }
}

/// Open the store for a session, falling back to an in-memory copy of the defaults.
fn open_store(path: Option<&Path>) -> (Box<dyn QueryStore>, Option<String>) {
    let error = match path {
        Some(path) => match FileStore::open(path) {
            Ok(store) => {
                let store: Box<dyn QueryStore> = Box::new(store);
                return (store, None);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "query store unavailable");
                format!("Query store unavailable, changes are not saved: {e}")
            }
        },
        None => "No config directory, changes are not saved".to_string(),
    };
    let store: Box<dyn QueryStore> = Box::new(MemoryStore::with_records(default_queries()));
    (store, Some(error))
}

async fn run_session(
    terminal: &mut DefaultTerminal,
    events: &mut EventHandler,
    ctx: &Context,
    profile: ConnectionProfile,
) -> Result<SessionExit> {
    info!(profile = %profile.name, target = %profile.label(), "session started");

    let (store, store_error) = open_store(ctx.store_path.as_deref());
    let mut app = App::new(ConnectionInfo::from_profile(&profile), store, &ctx.config);
    if let Some(message) = store_error {
        app.feedback.set_error(message);
    }
    let size = terminal.size()?;
    app.handle_resize(size.width, size.height);

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<DbCommand>(16);
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<DbResult>();

    let mut worker = Worker::new(profile.clone(), result_tx.clone());
    let worker_task = tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            let result = worker.handle(cmd).await;
            if worker.results.send(result).is_err() {
                break;
            }
        }
    });

    let mut tick = tokio::time::interval(ctx.config.tick_interval());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    app.dispatch(Instant::now());

    loop {
        while let Some(action) = forward_db_actions(&mut app, &cmd_tx) {
            match action {
                AppAction::Execute { .. } | AppAction::Backend { .. } => {}
                AppAction::GenerateSql {
                    request,
                    prompt,
                    current_sql,
                } => match &ctx.assistant {
                    Some(assistant) => {
                        info!(request, revising = current_sql.is_some(), "requesting generated SQL");
                        let assistant = assistant.clone();
                        let tx = result_tx.clone();
                        tokio::spawn(async move {
                            let result = assistant
                                .generate(&prompt, current_sql.as_deref())
                                .await
                                .map_err(|e| e.to_string());
                            let _ = tx.send(DbResult::Generated { request, result });
                        });
                    }
                    None => app.apply_generated_sql(
                        request,
                        Err("SQL generation is unavailable".to_string()),
                    ),
                },
                AppAction::CopyToClipboard(text) => {
                    let tx = result_tx.clone();
                    tokio::task::spawn_blocking(move || {
                        let result = arboard::Clipboard::new()
                            .and_then(|mut cb| cb.set_text(text))
                            .map_err(|e| e.to_string());
                        let _ = tx.send(DbResult::Clipboard(result));
                    });
                }
                AppAction::OpenShell => {
                    let mut command = Command::new(&ctx.config.psql_path);
                    command.args(profile.psql_args());
                    if !profile.password.is_empty() {
                        command.env("PGPASSWORD", &profile.password);
                    }
                    info!(profile = %profile.name, psql = %ctx.config.psql_path, "launching psql");
                    let result = run_outside_tui(terminal, events, &mut command).await?;
                    let size = terminal.size()?;
    app.handle_resize(size.width, size.height);
                    app.apply_shell_result(result, Instant::now());
                }
            }
        }

        if !app.is_running() {
            break;
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            biased;

            event = events.next() => {
                match event {
                    Some(AppEvent::Key(key)) => app.handle_key(key),
                    Some(AppEvent::Mouse(mouse)) => app.handle_mouse(mouse),
                    Some(AppEvent::Resize(width, height)) => app.handle_resize(width, height),
                    None => {
                        warn!("input stream closed");
                        app.exit = Some(SessionExit::Quit);
                    }
                }
            }
            Some(result) = result_rx.recv() => apply_result(&mut app, result),
            _ = tick.tick() => app.on_tick(Instant::now()),
        }
    }

    worker_task.abort();
    let exit = app.exit.unwrap_or(SessionExit::Quit);
    info!(profile = %profile.name, ?exit, "session ended");
    Ok(exit)
}

/// Drain the action slot, handing database work to the worker.
/// Returns the first action that needs the runtime itself.
fn forward_db_actions(app: &mut App, cmd_tx: &mpsc::Sender<DbCommand>) -> Option<AppAction> {
    while let Some(action) = app.feedback.pending_action.take() {
        match action {
            AppAction::Execute { generation, target } => {
                if let Err(e) = cmd_tx.try_send(DbCommand::Execute { generation, target }) {
                    app.abandon(generation, &format!("Could not queue the query: {e}"));
                }
            }
            AppAction::Backend { pid, action } => {
                info!(pid, ?action, "sending backend action");
                if let Err(e) = cmd_tx.try_send(DbCommand::Backend { pid, action }) {
                    app.apply_backend_action(
                        pid,
                        action,
                        Err(format!("Could not queue the action: {e}")),
                        Instant::now(),
                    );
                }
            }
            other => return Some(other),
        }
    }
    None
}

fn apply_result(app: &mut App, result: DbResult) {
    let now = Instant::now();
    match result {
        DbResult::Connected {
            ssl_mode,
            server_version,
        } => app.apply_connected(ssl_mode, server_version),
        DbResult::Query { generation, result } => app.apply_query_result(generation, result, now),
        DbResult::Home { generation, result } => app.apply_home(generation, result, now),
        DbResult::Active { generation, result } => app.apply_active(generation, result, now),
        DbResult::Backend {
            pid,
            action,
            result,
        } => app.apply_backend_action(pid, action, result, now),
        DbResult::Generated { request, result } => app.apply_generated_sql(request, result),
        DbResult::Clipboard(result) => app.apply_clipboard(result),
    }
}

fn enter_terminal() -> Result<DefaultTerminal> {
    let terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture).wrap_err("enabling mouse capture")?;
    Ok(terminal)
}

fn leave_terminal() {
    if let Err(e) = execute!(io::stdout(), DisableMouseCapture) {
        debug!(error = %e, "could not disable mouse capture");
    }
    ratatui::restore();
}

/// Hand the terminal to `command` until it exits, then take it back.
async fn run_outside_tui(
    terminal: &mut DefaultTerminal,
    events: &mut EventHandler,
    command: &mut Command,
) -> Result<Result<(), String>> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    events.suspend();
    // Let an in-progress poll finish so the child gets every keystroke.
    tokio::time::sleep(EVENT_POLL * 2).await;
    leave_terminal();

    let outcome = match command.status().await {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(format!("{program} exited with {status}")),
        Err(e) => Err(format!("{program}: {e}")),
    };
    match &outcome {
        Ok(()) => debug!(program = %program, "child process finished"),
        Err(e) => warn!(program = %program, error = %e, "child process failed"),
    }

    *terminal = enter_terminal()?;
    terminal.clear()?;
    events.resume();
    Ok(outcome)
}
