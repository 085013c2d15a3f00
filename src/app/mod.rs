//! Session controller: application state and key handling.

mod actions;
mod editor;
mod mode;
mod registry;
mod search;
mod state;

pub use actions::{AppAction, BackendAction, QueryTarget};
pub use editor::{
    parse_order, AssistState, EditorField, EditorOutcome, EditorState, OrderInput, TextInput,
};
pub use mode::{Mode, SessionExit, Tab, ACTIVE_TAB, HOME_TAB};
pub use registry::{page_size_for, ProcessRegistry, RegistryMode, RegistryOutcome};
pub use search::{filter_candidates, SearchState};
pub use state::{ConnectionInfo, Throughput, UiFeedback};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::db::models::{ActiveProcess, HomeSnapshot, TabularRows};
use crate::store::{QueryStore, SavedQuery};
use crate::ui;

pub struct App {
    pub connection: ConnectionInfo,
    pub mode: Mode,
    pub exit: Option<SessionExit>,

    // Tabs
    pub tabs: Vec<Tab>,
    /// Every tab plus hidden queries; what search filters.
    pub candidates: Vec<Tab>,
    pub selected: usize,
    /// Selection to restore when a modal closes.
    pub previous_selected: usize,
    /// Session-only orders for hidden queries promoted through search.
    pub temp_orders: HashMap<String, i64>,

    // Results
    pub result: Option<TabularRows>,
    pub result_scroll: usize,
    pub viewport_rows: usize,
    pub home: Option<HomeSnapshot>,
    pub throughput: Throughput,
    /// Present only while the Active tab is selected.
    pub registry: Option<ProcessRegistry>,

    pub feedback: UiFeedback,
    pub overlay_scroll: u16,
    pub terminal_width: u16,
    pub terminal_height: u16,

    // Dispatch bookkeeping
    generation: u64,
    in_flight: Option<u64>,
    last_refresh: Option<Instant>,
    pub last_success: Option<Instant>,
    cooldown: Duration,
    assist_seq: u64,

    store: Box<dyn QueryStore>,
    export_path: Option<PathBuf>,
}

impl App {
    pub fn new(connection: ConnectionInfo, store: Box<dyn QueryStore>, config: &AppConfig) -> Self {
        let mut app = Self {
            connection,
            mode: Mode::Normal,
            exit: None,
            tabs: vec![Tab::Home, Tab::Active],
            candidates: vec![Tab::Home, Tab::Active],
            selected: 0,
            previous_selected: 0,
            temp_orders: HashMap::new(),
            result: None,
            result_scroll: 0,
            viewport_rows: 20,
            home: None,
            throughput: Throughput::new(config.sparkline_points),
            registry: None,
            feedback: UiFeedback::default(),
            overlay_scroll: 0,
            terminal_width: 80,
            terminal_height: 24,
            generation: 0,
            in_flight: None,
            last_refresh: None,
            last_success: None,
            cooldown: config.refresh_cooldown(),
            assist_seq: 0,
            store,
            export_path: config.export_path(),
        };
        app.reload_tabs();
        app
    }

    pub const fn is_running(&self) -> bool {
        self.exit.is_none()
    }

    pub const fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.selected)
    }

    pub fn on_active_tab(&self) -> bool {
        matches!(self.current_tab(), Some(Tab::Active))
    }

    /// Stored order, or the session-only order of a promoted hidden query.
    pub fn effective_order(&self, query: &SavedQuery) -> Option<i64> {
        query
            .order_position
            .or_else(|| self.temp_orders.get(&query.name).copied())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tab list
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild the tab strip and search candidates from the store.
    pub fn reload_tabs(&mut self) {
        let all = match self.store.list(false) {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "failed to load queries");
                self.feedback.set_error(format!("Failed to load queries: {e}"));
                return;
            }
        };

        self.temp_orders
            .retain(|name, _| all.iter().any(|q| &q.name == name && q.order_position.is_none()));

        let mut visible: Vec<(i64, SavedQuery)> = all
            .iter()
            .filter_map(|q| self.effective_order(q).map(|o| (o, q.clone())))
            .collect();
        visible.sort_by(|(oa, a), (ob, b)| oa.cmp(ob).then_with(|| a.name.cmp(&b.name)));

        self.tabs = [Tab::Home, Tab::Active]
            .into_iter()
            .chain(visible.into_iter().map(|(_, q)| Tab::Query(q)))
            .collect();
        self.candidates = [Tab::Home, Tab::Active]
            .into_iter()
            .chain(all.into_iter().map(Tab::Query))
            .collect();
        self.selected = self.selected.min(self.tabs.len() - 1);
        self.previous_selected = self.previous_selected.min(self.tabs.len() - 1);
    }

    fn position_of(&self, tab: &Tab) -> Option<usize> {
        self.tabs.iter().position(|t| match (t, tab) {
            (Tab::Query(a), Tab::Query(b)) => a.name == b.name,
            (a, b) => a.is_builtin() && std::mem::discriminant(a) == std::mem::discriminant(b),
        })
    }

    fn select_query_named(&mut self, name: &str) {
        if let Some(i) = self.tabs.iter().position(|t| matches!(t, Tab::Query(q) if q.name == name)) {
            self.selected = i;
        }
    }

    fn next_temp_order(&self) -> i64 {
        self.tabs
            .iter()
            .filter_map(Tab::as_query)
            .filter_map(|q| self.effective_order(q))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn restore_selection(&mut self) {
        self.selected = self.previous_selected.min(self.tabs.len().saturating_sub(1));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    fn current_target(&self) -> Option<QueryTarget> {
        match self.current_tab()? {
            Tab::Home => Some(QueryTarget::Home),
            Tab::Active => Some(QueryTarget::Active),
            Tab::Query(q) => Some(QueryTarget::Sql(q.sql.clone())),
        }
    }

    /// Issue an execution of the selected tab, superseding any in flight.
    pub fn dispatch(&mut self, now: Instant) {
        let Some(target) = self.current_target() else {
            return;
        };
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.last_refresh = Some(now);
        debug!(
            generation = self.generation,
            tab = self.current_tab().map_or("", Tab::name),
            "dispatching execution"
        );
        self.feedback.pending_action = Some(AppAction::Execute {
            generation: self.generation,
            target,
        });
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_refresh
            .map_or(true, |t| now.saturating_duration_since(t) >= self.cooldown)
    }

    /// Manual refresh; dropped while the cooldown is running.
    pub fn manual_refresh(&mut self, now: Instant) {
        if self.cooldown_elapsed(now) {
            self.dispatch(now);
        } else {
            debug!("refresh throttled by cooldown");
        }
    }

    /// Periodic timer fire. Acts only in Normal mode with nothing in flight.
    pub fn on_tick(&mut self, now: Instant) {
        if self.mode.is_normal() && self.in_flight.is_none() && self.cooldown_elapsed(now) {
            self.dispatch(now);
        }
    }

    /// The runtime could not hand `generation` to the worker.
    pub fn abandon(&mut self, generation: u64, reason: &str) {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        warn!(generation, reason, "execution not dispatched");
        self.feedback.set_error(reason);
    }

    /// True when `generation` is the latest dispatch. Stale completions are dropped.
    fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale result");
            return false;
        }
        self.in_flight = None;
        true
    }

    fn mark_success(&mut self, now: Instant) {
        self.feedback.last_error = None;
        self.feedback.expire_status();
        self.last_refresh = Some(now);
        self.last_success = Some(now);
    }

    fn switch_to(&mut self, index: usize, now: Instant) {
        if index == self.selected || index >= self.tabs.len() {
            return;
        }
        self.selected = index;
        self.on_tab_changed(now);
    }

    fn on_tab_changed(&mut self, now: Instant) {
        self.feedback.last_error = None;
        self.feedback.clear_status();
        self.result = None;
        self.result_scroll = 0;
        self.registry = if self.on_active_tab() {
            let mut registry = ProcessRegistry::new();
            registry.set_viewport_height(self.terminal_height);
            Some(registry)
        } else {
            None
        };
        self.dispatch(now);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Completions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn apply_query_result(
        &mut self,
        generation: u64,
        result: Result<TabularRows, String>,
        now: Instant,
    ) {
        if !self.accept(generation) {
            return;
        }
        match result {
            Ok(rows) => {
                debug!(generation, rows = rows.rows.len(), "applying result");
                self.result = Some(rows);
                self.clamp_result_scroll();
                self.mark_success(now);
            }
            Err(e) => {
                debug!(generation, error = %e, "query failed");
                self.feedback.set_error(e);
            }
        }
    }

    pub fn apply_home(&mut self, generation: u64, result: Result<HomeSnapshot, String>, now: Instant) {
        if !self.accept(generation) {
            return;
        }
        match result {
            Ok(snap) => {
                self.throughput.record(&snap);
                self.home = Some(snap);
                self.mark_success(now);
            }
            Err(e) => self.feedback.set_error(e),
        }
    }

    pub fn apply_active(
        &mut self,
        generation: u64,
        result: Result<Vec<ActiveProcess>, String>,
        now: Instant,
    ) {
        if !self.accept(generation) {
            return;
        }
        let Some(registry) = self.registry.as_mut() else {
            return;
        };
        match result {
            Ok(processes) => {
                registry.update_selection(processes);
                self.mark_success(now);
            }
            Err(e) => registry.record_fetch_error(e),
        }
    }

    pub fn apply_backend_action(
        &mut self,
        pid: i32,
        action: BackendAction,
        result: Result<(), String>,
        now: Instant,
    ) {
        match &result {
            Ok(()) => info!(pid, ?action, "backend action succeeded"),
            Err(e) => warn!(pid, ?action, error = %e, "backend action failed"),
        }
        let ok = result.is_ok();
        match self.registry.as_mut() {
            Some(registry) => registry.complete_action(result),
            None => {
                if let Err(e) = result {
                    self.feedback.set_error(e);
                }
            }
        }
        if ok {
            self.feedback.set_status(action.done_message(pid));
            if self.on_active_tab() {
                self.dispatch(now);
            }
        }
    }

    pub fn apply_clipboard(&mut self, result: Result<(), String>) {
        let message = match result {
            Ok(()) => "Copied to clipboard".to_string(),
            Err(e) => format!("Copy failed: {e}"),
        };
        match self.registry.as_mut() {
            Some(registry) if registry.mode == RegistryMode::Detail => {
                registry.copy_status = Some(message);
            }
            _ => self.feedback.set_status(message),
        }
    }

    pub fn apply_generated_sql(&mut self, request: u64, result: Result<String, String>) {
        let Mode::Edit(editor) = &mut self.mode else {
            debug!(request, "dropping generated SQL outside the editor");
            return;
        };
        let Some(assist) = editor.assist.as_mut() else {
            return;
        };
        if assist.request != request || !assist.in_flight {
            debug!(request, "dropping stale generated SQL");
            return;
        }
        match result {
            Ok(sql) => {
                assist.in_flight = false;
                assist.response = Some(sql);
            }
            Err(e) => {
                editor.assist = None;
                self.feedback.set_error(e);
            }
        }
    }

    pub fn apply_shell_result(&mut self, result: Result<(), String>, now: Instant) {
        if let Err(e) = result {
            self.feedback.set_error(format!("Failed to open psql: {e}"));
        }
        self.dispatch(now);
    }

    pub fn apply_connected(&mut self, ssl_mode: &str, server_version: Option<String>) {
        self.connection.ssl_mode = Some(ssl_mode.to_string());
        if server_version.is_some() {
            self.connection.server_version = server_version;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Terminal events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.terminal_width = width;
        self.terminal_height = height;
        self.viewport_rows = ui::layout::result_viewport_rows(height);
        self.clamp_result_scroll();
        if let Some(registry) = self.registry.as_mut() {
            registry.set_viewport_height(height);
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !self.mode.is_normal() || mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if mouse.row != ui::layout::TAB_ROW {
            return;
        }
        let offset = ui::header::tab_offset(&self.tabs, self.selected, self.terminal_width);
        if let Some(index) = ui::header::tab_index_at(&self.tabs, offset, mouse.column) {
            self.switch_to(index, Instant::now());
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match self.mode {
            Mode::Help => self.handle_help_key(key),
            Mode::Search(_) => self.handle_search_key(key, now),
            Mode::Edit(_) => self.handle_edit_key(key, now),
            Mode::Normal => self.handle_normal_key(key, now),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Normal mode
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.exit = Some(SessionExit::Quit);
            return;
        }

        if let Some(registry) = self.registry.as_mut() {
            match registry.handle_key(key) {
                RegistryOutcome::Ignored => {}
                RegistryOutcome::Handled => return,
                RegistryOutcome::Copy(text) => {
                    self.feedback.pending_action = Some(AppAction::CopyToClipboard(text));
                    return;
                }
                RegistryOutcome::Run { pid, action } => {
                    info!(pid, ?action, "backend action confirmed");
                    self.feedback.pending_action = Some(AppAction::Backend { pid, action });
                    return;
                }
            }
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.exit = Some(SessionExit::Quit),
            KeyCode::Char('c') => self.exit = Some(SessionExit::SwitchProfile),
            KeyCode::Char('?') => {
                self.previous_selected = self.selected;
                self.overlay_scroll = 0;
                self.mode = Mode::Help;
            }
            KeyCode::Char('s' | '/') => {
                self.previous_selected = self.selected;
                self.mode = Mode::Search(SearchState::new(&self.candidates));
            }
            KeyCode::Left | KeyCode::Char('h') => {
                if self.selected > 0 {
                    self.switch_to(self.selected - 1, now);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => self.switch_to(self.selected + 1, now),
            KeyCode::Enter | KeyCode::Char(' ' | 'r') => self.manual_refresh(now),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_result_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_result_down(1),
            KeyCode::PageUp => self.scroll_result_up(self.half_page()),
            KeyCode::PageDown => self.scroll_result_down(self.half_page()),
            KeyCode::Home => self.result_scroll = 0,
            KeyCode::End => self.result_scroll = self.max_result_scroll(),
            KeyCode::Char('e') => self.open_editor(),
            KeyCode::Char('n') => {
                self.previous_selected = self.selected;
                self.mode = Mode::Edit(EditorState::new_query());
            }
            KeyCode::Char('d') => self.export_queries(),
            KeyCode::Char('x') => self.feedback.pending_action = Some(AppAction::OpenShell),
            _ => {}
        }
    }

    fn open_editor(&mut self) {
        let Some(query) = self.current_tab().and_then(Tab::as_query) else {
            debug!("built-in tabs are not editable");
            return;
        };
        let editor = EditorState::edit(query, self.effective_order(query));
        self.previous_selected = self.selected;
        self.mode = Mode::Edit(editor);
    }

    fn export_queries(&mut self) {
        let Some(path) = self.export_path.clone() else {
            self.feedback
                .set_error("Failed to dump queries: no home directory");
            return;
        };
        match self.store.export_all(&path) {
            Ok(_) => self
                .feedback
                .set_status(format!("Queries dumped to: {}", path.display())),
            Err(e) => self.feedback.set_error(format!("Failed to dump queries: {e}")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Result viewport
    // ─────────────────────────────────────────────────────────────────────────

    fn half_page(&self) -> usize {
        (self.viewport_rows / 2).max(1)
    }

    pub fn max_result_scroll(&self) -> usize {
        self.result
            .as_ref()
            .map_or(0, |r| r.rows.len().saturating_sub(self.viewport_rows))
    }

    fn clamp_result_scroll(&mut self) {
        self.result_scroll = self.result_scroll.min(self.max_result_scroll());
    }

    fn scroll_result_up(&mut self, by: usize) {
        self.result_scroll = self.result_scroll.saturating_sub(by);
    }

    fn scroll_result_down(&mut self, by: usize) {
        self.result_scroll = (self.result_scroll + by).min(self.max_result_scroll());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Help
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_help_key(&mut self, key: KeyEvent) {
        if self.handle_overlay_scroll(key) {
            return;
        }
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?' | 'q')) {
            self.restore_selection();
            self.mode = Mode::Normal;
        }
    }

    /// Handle scroll keys for overlays. Returns true if key was handled.
    fn handle_overlay_scroll(&mut self, key: KeyEvent) -> bool {
        const PAGE_SIZE: u16 = 10;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.overlay_scroll = self.overlay_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.overlay_scroll = self.overlay_scroll.saturating_add(1);
            }
            KeyCode::PageUp => self.overlay_scroll = self.overlay_scroll.saturating_sub(PAGE_SIZE),
            KeyCode::PageDown => self.overlay_scroll = self.overlay_scroll.saturating_add(PAGE_SIZE),
            KeyCode::Char('u') if ctrl => {
                self.overlay_scroll = self.overlay_scroll.saturating_sub(PAGE_SIZE);
            }
            KeyCode::Char('d') if ctrl => {
                self.overlay_scroll = self.overlay_scroll.saturating_add(PAGE_SIZE);
            }
            KeyCode::Char('g') => self.overlay_scroll = 0,
            KeyCode::Char('G') => self.overlay_scroll = u16::MAX,
            _ => return false,
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        let Mode::Search(search) = &mut self.mode else {
            return;
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.restore_selection();
            }
            KeyCode::Char('c') if ctrl => {
                self.mode = Mode::Normal;
                self.restore_selection();
            }
            KeyCode::Enter => {
                let Some(index) = search.highlighted() else {
                    return;
                };
                let Some(tab) = self.candidates.get(index).cloned() else {
                    return;
                };
                self.commit_search(&tab, now);
            }
            KeyCode::Up => search.select_prev(),
            KeyCode::Down => search.select_next(),
            KeyCode::Backspace => search.pop_char(&self.candidates),
            KeyCode::Char(c) if !ctrl => search.push_char(c, &self.candidates),
            _ => {}
        }
    }

    fn commit_search(&mut self, tab: &Tab, now: Instant) {
        if let Tab::Query(q) = tab {
            if self.effective_order(q).is_none() {
                let order = self.next_temp_order();
                info!(query = %q.name, order, "promoting hidden query for this session");
                self.temp_orders.insert(q.name.clone(), order);
                self.reload_tabs();
            }
        }
        self.mode = Mode::Normal;
        if let Some(i) = self.position_of(tab) {
            self.selected = i;
        }
        self.on_tab_changed(now);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editor
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_edit_key(&mut self, key: KeyEvent, now: Instant) {
        let Mode::Edit(editor) = &mut self.mode else {
            return;
        };
        match editor.handle_key(key) {
            EditorOutcome::Continue => {}
            EditorOutcome::Cancel => {
                self.mode = Mode::Normal;
                self.restore_selection();
            }
            EditorOutcome::Save => self.save_editor(now),
            EditorOutcome::Delete => self.delete_editor(now),
            EditorOutcome::Generate {
                prompt,
                current_sql,
            } => {
                self.assist_seq += 1;
                if let Some(assist) = editor.assist.as_mut() {
                    assist.request = self.assist_seq;
                }
                info!(request = self.assist_seq, "requesting generated SQL");
                self.feedback.pending_action = Some(AppAction::GenerateSql {
                    request: self.assist_seq,
                    prompt,
                    current_sql,
                });
            }
        }
    }

    fn save_editor(&mut self, now: Instant) {
        let Mode::Edit(editor) = &self.mode else {
            return;
        };
        let query = editor.to_query();
        let original = editor.original_name.clone();
        if query.name.is_empty() {
            self.feedback.set_error("Query name cannot be empty");
            return;
        }

        if let Err(e) = self.store.save(query.clone()) {
            warn!(query = %query.name, error = %e, "save failed");
            self.feedback.set_error(format!("Failed to save query: {e}"));
            return;
        }

        let mut moved_order = None;
        if let Some(old) = original.filter(|old| *old != query.name) {
            if let Err(e) = self.store.delete(&old) {
                warn!(query = %old, error = %e, "could not remove renamed query");
                self.feedback
                    .set_error(format!("Failed to remove old query '{old}': {e}"));
            }
            moved_order = self.temp_orders.remove(&old);
        }

        if query.order_position.is_some() {
            self.temp_orders.remove(&query.name);
        } else if let Some(order) = moved_order {
            self.temp_orders.insert(query.name.clone(), order);
        } else if !self.temp_orders.contains_key(&query.name) {
            let order = self.next_temp_order();
            self.temp_orders.insert(query.name.clone(), order);
        }

        info!(query = %query.name, order = ?query.order_position, "saved query");
        self.reload_tabs();
        self.select_query_named(&query.name);
        self.mode = Mode::Normal;
        self.on_tab_changed(now);
        self.feedback.set_status(format!("Saved query '{}'", query.name));
    }

    fn delete_editor(&mut self, now: Instant) {
        let Mode::Edit(editor) = &self.mode else {
            return;
        };
        let Some(name) = editor.original_name.clone() else {
            self.mode = Mode::Normal;
            self.restore_selection();
            return;
        };

        if let Err(e) = self.store.delete(&name) {
            warn!(query = %name, error = %e, "delete failed");
            self.feedback.set_error(format!("Failed to delete query: {e}"));
            return;
        }

        info!(query = %name, "deleted query");
        self.temp_orders.remove(&name);
        self.reload_tabs();
        self.restore_selection();
        self.mode = Mode::Normal;
        self.on_tab_changed(now);
        self.feedback.set_status(format!("Deleted query '{name}'"));
    }
}
