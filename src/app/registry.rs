//! Live list of backend processes behind the Active tab.
//!
//! The selection is anchored to a PID: after every refresh the row index is
//! derived by locating that PID in the new list, never the other way round.
//! When the PID disappears the index clamps to the last row and the anchor
//! moves to whatever process now sits there.

use crossterm::event::{KeyCode, KeyEvent};

use super::actions::BackendAction;
use crate::db::models::ActiveProcess;

/// Rows reserved for the title, header, footer hints and borders.
const CHROME_ROWS: usize = 10;
const MIN_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    List,
    Detail,
    ConfirmTerminate,
}

/// What the controller must do after the registry consumed a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOutcome {
    /// The key is not a registry key; the session should handle it.
    Ignored,
    Handled,
    Copy(String),
    Run { pid: i32, action: BackendAction },
}

#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    pub processes: Vec<ActiveProcess>,
    pub selected_index: usize,
    /// Identity anchor; 0 means nothing selected yet.
    pub selected_pid: i32,
    pub mode: RegistryMode,
    /// Frozen copy of the pinned process in Detail and ConfirmTerminate.
    pub detail: Option<ActiveProcess>,
    pub detail_live: bool,
    pub pending_action: Option<BackendAction>,
    pub action_in_flight: bool,
    pub last_error: Option<String>,
    pub copy_status: Option<String>,
    pub scroll_offset: usize,
    page_size: usize,
    error_from_fetch: bool,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows of the process list that fit a terminal `height` rows tall.
pub fn page_size_for(height: u16) -> usize {
    (height as usize).saturating_sub(CHROME_ROWS).max(MIN_PAGE_SIZE)
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            selected_index: 0,
            selected_pid: 0,
            mode: RegistryMode::List,
            detail: None,
            detail_live: false,
            pending_action: None,
            action_in_flight: false,
            last_error: None,
            copy_status: None,
            scroll_offset: 0,
            page_size: MIN_PAGE_SIZE,
            error_from_fetch: false,
        }
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_viewport_height(&mut self, height: u16) {
        self.page_size = page_size_for(height);
        self.ensure_visible();
    }

    /// Replace the list with a fresh fetch and re-derive the selection.
    pub fn update_selection(&mut self, processes: Vec<ActiveProcess>) {
        self.processes = processes;
        if self.error_from_fetch {
            self.last_error = None;
            self.error_from_fetch = false;
        }

        // Keep the pinned snapshot current while its backend still exists
        if self.detail_live {
            if let Some(pinned) = &self.detail {
                match self.processes.iter().find(|p| p.pid == pinned.pid) {
                    Some(current) => self.detail = Some(current.clone()),
                    None => self.detail_live = false,
                }
            }
        }

        if self.selected_pid != 0 {
            if let Some(idx) = self.processes.iter().position(|p| p.pid == self.selected_pid) {
                self.selected_index = idx;
                self.ensure_visible();
                return;
            }
        }

        if self.selected_index >= self.processes.len() {
            self.selected_index = self.processes.len().saturating_sub(1);
        }
        if let Some(p) = self.processes.get(self.selected_index) {
            self.selected_pid = p.pid;
        }
        self.ensure_visible();
    }

    /// A failed fetch keeps the previous list on screen.
    pub fn record_fetch_error(&mut self, error: String) {
        self.last_error = Some(error);
        self.error_from_fetch = true;
    }

    pub fn selected_process(&self) -> Option<&ActiveProcess> {
        self.processes.get(self.selected_index)
    }

    /// First and one-past-last row shown in the list window.
    pub fn visible_range(&self) -> (usize, usize) {
        let end = (self.scroll_offset + self.page_size).min(self.processes.len());
        (self.scroll_offset.min(end), end)
    }

    pub fn ensure_visible(&mut self) {
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        }
        if self.selected_index >= self.scroll_offset + self.page_size {
            self.scroll_offset = self.selected_index + 1 - self.page_size;
        }
        let max_offset = self.processes.len().saturating_sub(self.page_size);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    fn select(&mut self, index: usize) {
        if self.processes.is_empty() {
            return;
        }
        self.selected_index = index.min(self.processes.len() - 1);
        self.selected_pid = self.processes[self.selected_index].pid;
        self.ensure_visible();
    }

    pub fn select_next(&mut self) {
        self.select(self.selected_index + 1);
    }

    pub fn select_prev(&mut self) {
        self.select(self.selected_index.saturating_sub(1));
    }

    pub fn page_down(&mut self) {
        self.select(self.selected_index + self.page_size);
    }

    pub fn page_up(&mut self) {
        self.select(self.selected_index.saturating_sub(self.page_size));
    }

    pub fn select_first(&mut self) {
        self.select(0);
    }

    pub fn select_last(&mut self) {
        self.select(self.processes.len().saturating_sub(1));
    }

    pub fn open_detail(&mut self) {
        if let Some(p) = self.selected_process().cloned() {
            self.detail = Some(p);
            self.detail_live = true;
            self.copy_status = None;
            self.mode = RegistryMode::Detail;
        }
    }

    pub fn close_detail(&mut self) {
        self.mode = RegistryMode::List;
        self.detail = None;
        self.detail_live = false;
        self.copy_status = None;
    }

    /// Ask for confirmation of `action` against the selected (List) or
    /// pinned (Detail) process. A finished pinned process cannot be targeted.
    pub fn request_action(&mut self, action: BackendAction) {
        match self.mode {
            RegistryMode::List => {
                let Some(p) = self.selected_process().cloned() else {
                    return;
                };
                self.detail = Some(p);
                self.detail_live = true;
            }
            RegistryMode::Detail => {
                if !self.detail_live || self.detail.is_none() {
                    return;
                }
            }
            RegistryMode::ConfirmTerminate => return,
        }
        self.last_error = None;
        self.error_from_fetch = false;
        self.pending_action = Some(action);
        self.mode = RegistryMode::ConfirmTerminate;
    }

    /// Fire the pending action. Returns what to run, at most once.
    pub fn confirm(&mut self) -> Option<(i32, BackendAction)> {
        if self.mode != RegistryMode::ConfirmTerminate || self.action_in_flight {
            return None;
        }
        let action = self.pending_action?;
        let pid = self.detail.as_ref()?.pid;
        self.action_in_flight = true;
        Some((pid, action))
    }

    pub fn dismiss_confirm(&mut self) {
        if self.action_in_flight {
            return;
        }
        self.pending_action = None;
        self.close_detail();
    }

    /// Settle a backend action. Either way the view returns to List.
    pub fn complete_action(&mut self, outcome: Result<(), String>) {
        self.action_in_flight = false;
        self.pending_action = None;
        self.close_detail();
        if let Err(e) = outcome {
            self.last_error = Some(e);
            self.error_from_fetch = false;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> RegistryOutcome {
        match self.mode {
            RegistryMode::List => self.handle_list_key(key),
            RegistryMode::Detail => self.handle_detail_key(key),
            RegistryMode::ConfirmTerminate => self.handle_confirm_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> RegistryOutcome {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::Home | KeyCode::Char('g') => self.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.select_last(),
            KeyCode::Enter => self.open_detail(),
            KeyCode::Char('t') => self.request_action(BackendAction::Terminate),
            KeyCode::Char('c') => self.request_action(BackendAction::Cancel),
            _ => return RegistryOutcome::Ignored,
        }
        RegistryOutcome::Handled
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> RegistryOutcome {
        match key.code {
            KeyCode::Esc => self.close_detail(),
            KeyCode::Char('t') => self.request_action(BackendAction::Terminate),
            KeyCode::Char('c') => self.request_action(BackendAction::Cancel),
            KeyCode::Char('y') => {
                return match &self.detail {
                    Some(p) => RegistryOutcome::Copy(p.query.clone()),
                    None => RegistryOutcome::Handled,
                };
            }
            KeyCode::Enter => {}
            _ => return RegistryOutcome::Ignored,
        }
        RegistryOutcome::Handled
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> RegistryOutcome {
        match key.code {
            KeyCode::Char('y' | 'Y') => match self.confirm() {
                Some((pid, action)) => RegistryOutcome::Run { pid, action },
                None => RegistryOutcome::Handled,
            },
            KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                self.dismiss_confirm();
                RegistryOutcome::Handled
            }
            // Confirmation is modal
            _ => RegistryOutcome::Handled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use proptest::prelude::*;

    fn proc(pid: i32) -> ActiveProcess {
        ActiveProcess {
            pid,
            username: "app".into(),
            database: "orders".into(),
            state: "active".into(),
            query: format!("SELECT pg_sleep({pid})"),
            ..ActiveProcess::default()
        }
    }

    fn procs(pids: &[i32]) -> Vec<ActiveProcess> {
        pids.iter().copied().map(proc).collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn registry_with(pids: &[i32]) -> ProcessRegistry {
        let mut r = ProcessRegistry::new();
        r.update_selection(procs(pids));
        r
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Selection anchoring
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn first_fetch_anchors_first_row() {
        let r = registry_with(&[10, 20, 30]);
        assert_eq!(r.selected_index, 0);
        assert_eq!(r.selected_pid, 10);
    }

    #[test]
    fn selection_follows_pid_when_rows_shift() {
        let mut r = registry_with(&[10, 20, 30]);
        r.select_next();
        assert_eq!((r.selected_index, r.selected_pid), (1, 20));

        r.update_selection(procs(&[5, 10, 20]));
        assert_eq!(r.selected_index, 2);
        assert_eq!(r.selected_pid, 20);
    }

    #[test]
    fn vanished_pid_clamps_and_reanchors() {
        let mut r = registry_with(&[10, 20, 30]);
        r.select_last();
        assert_eq!(r.selected_pid, 30);

        r.update_selection(procs(&[10, 20]));
        assert_eq!(r.selected_index, 1);
        assert_eq!(r.selected_pid, 20);
    }

    #[test]
    fn vanished_pid_keeps_index_when_still_in_range() {
        let mut r = registry_with(&[10, 20, 30]);
        r.select_next();
        r.update_selection(procs(&[10, 40, 30]));
        assert_eq!(r.selected_index, 1);
        assert_eq!(r.selected_pid, 40);
    }

    #[test]
    fn empty_refresh_leaves_anchor_alone() {
        let mut r = registry_with(&[10, 20]);
        r.update_selection(Vec::new());
        assert_eq!(r.selected_index, 0);
        assert_eq!(r.selected_pid, 10);
        assert!(r.selected_process().is_none());

        // Returning process is found again
        r.update_selection(procs(&[3, 10]));
        assert_eq!(r.selected_index, 1);
    }

    #[test]
    fn navigation_does_not_wrap() {
        let mut r = registry_with(&[1, 2, 3]);
        r.select_prev();
        assert_eq!(r.selected_index, 0);
        r.select_last();
        r.select_next();
        assert_eq!(r.selected_index, 2);
        assert_eq!(r.selected_pid, 3);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Pagination
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn page_size_has_a_floor() {
        assert_eq!(page_size_for(40), 30);
        assert_eq!(page_size_for(12), 5);
        assert_eq!(page_size_for(0), 5);
    }

    #[test]
    fn window_follows_selection_down_and_up() {
        let pids: Vec<i32> = (1..=20).collect();
        let mut r = registry_with(&pids);
        r.set_viewport_height(15); // page of 5
        for _ in 0..7 {
            r.select_next();
        }
        assert_eq!(r.selected_index, 7);
        assert_eq!(r.scroll_offset, 3);
        assert_eq!(r.visible_range(), (3, 8));

        for _ in 0..5 {
            r.select_prev();
        }
        assert_eq!(r.selected_index, 2);
        assert_eq!(r.scroll_offset, 2);
    }

    #[test]
    fn paging_moves_a_full_window() {
        let pids: Vec<i32> = (1..=12).collect();
        let mut r = registry_with(&pids);
        r.set_viewport_height(15);
        r.page_down();
        assert_eq!(r.selected_index, 5);
        r.page_down();
        r.page_down();
        assert_eq!(r.selected_index, 11);
        assert_eq!(r.visible_range(), (7, 12));
        r.page_up();
        assert_eq!(r.selected_index, 6);
    }

    #[test]
    fn shrinking_list_pulls_window_back() {
        let pids: Vec<i32> = (1..=20).collect();
        let mut r = registry_with(&pids);
        r.set_viewport_height(15);
        r.select_last();
        assert_eq!(r.scroll_offset, 15);
        r.update_selection(procs(&[1, 2, 3]));
        assert_eq!(r.selected_index, 2);
        assert_eq!(r.scroll_offset, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Detail and confirmation
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn enter_pins_selected_process() {
        let mut r = registry_with(&[10, 20]);
        r.select_next();
        assert_eq!(r.handle_key(key(KeyCode::Enter)), RegistryOutcome::Handled);
        assert_eq!(r.mode, RegistryMode::Detail);
        assert_eq!(r.detail.as_ref().map(|p| p.pid), Some(20));
        assert!(r.detail_live);
    }

    #[test]
    fn finished_process_stays_inspectable_but_not_actionable() {
        let mut r = registry_with(&[10, 20]);
        r.open_detail();
        r.update_selection(procs(&[20]));
        assert!(!r.detail_live);
        assert_eq!(r.detail.as_ref().map(|p| p.pid), Some(10));

        r.handle_key(key(KeyCode::Char('t')));
        assert_eq!(r.mode, RegistryMode::Detail);

        let copied = r.handle_key(key(KeyCode::Char('y')));
        assert_eq!(copied, RegistryOutcome::Copy("SELECT pg_sleep(10)".into()));
    }

    #[test]
    fn finished_process_does_not_come_back_to_life() {
        let mut r = registry_with(&[10]);
        r.open_detail();
        r.update_selection(Vec::new());
        r.update_selection(procs(&[10]));
        assert!(!r.detail_live);
    }

    #[test]
    fn live_detail_tracks_latest_snapshot() {
        let mut r = registry_with(&[10]);
        r.open_detail();
        let mut changed = proc(10);
        changed.state = "idle in transaction".into();
        r.update_selection(vec![changed]);
        assert_eq!(r.detail.as_ref().map(|p| p.state.as_str()), Some("idle in transaction"));
    }

    #[test]
    fn escape_from_detail_clears_pinned_state() {
        let mut r = registry_with(&[10]);
        r.open_detail();
        r.copy_status = Some("Copied to clipboard".into());
        r.handle_key(key(KeyCode::Esc));
        assert_eq!(r.mode, RegistryMode::List);
        assert!(r.detail.is_none());
        assert!(r.copy_status.is_none());
    }

    #[test]
    fn list_t_and_c_ask_for_confirmation() {
        let mut r = registry_with(&[10]);
        r.handle_key(key(KeyCode::Char('t')));
        assert_eq!(r.mode, RegistryMode::ConfirmTerminate);
        assert_eq!(r.pending_action, Some(BackendAction::Terminate));

        r.handle_key(key(KeyCode::Char('n')));
        assert_eq!(r.mode, RegistryMode::List);
        assert!(r.pending_action.is_none());

        r.handle_key(key(KeyCode::Char('c')));
        assert_eq!(r.pending_action, Some(BackendAction::Cancel));
        r.handle_key(key(KeyCode::Esc));
        assert_eq!(r.mode, RegistryMode::List);
    }

    #[test]
    fn action_keys_on_empty_list_do_nothing() {
        let mut r = ProcessRegistry::new();
        r.handle_key(key(KeyCode::Char('t')));
        r.handle_key(key(KeyCode::Enter));
        assert_eq!(r.mode, RegistryMode::List);
    }

    #[test]
    fn yes_fires_once() {
        let mut r = registry_with(&[10]);
        r.handle_key(key(KeyCode::Char('t')));
        assert_eq!(
            r.handle_key(key(KeyCode::Char('y'))),
            RegistryOutcome::Run {
                pid: 10,
                action: BackendAction::Terminate
            }
        );
        assert_eq!(r.handle_key(key(KeyCode::Char('y'))), RegistryOutcome::Handled);
        // Cannot back out while the call is running
        r.handle_key(key(KeyCode::Esc));
        assert_eq!(r.mode, RegistryMode::ConfirmTerminate);
    }

    #[test]
    fn confirmation_swallows_other_keys() {
        let mut r = registry_with(&[10, 20]);
        r.handle_key(key(KeyCode::Char('c')));
        assert_eq!(r.handle_key(key(KeyCode::Char('q'))), RegistryOutcome::Handled);
        assert_eq!(r.handle_key(key(KeyCode::Down)), RegistryOutcome::Handled);
        assert_eq!(r.selected_index, 0);
    }

    #[test]
    fn completion_returns_to_list() {
        let mut r = registry_with(&[10]);
        r.handle_key(key(KeyCode::Char('t')));
        r.confirm();
        r.complete_action(Ok(()));
        assert_eq!(r.mode, RegistryMode::List);
        assert!(r.last_error.is_none());
        assert!(!r.action_in_flight);

        r.handle_key(key(KeyCode::Char('c')));
        r.confirm();
        r.complete_action(Err("pg_cancel_backend returned false for PID 10".into()));
        assert_eq!(r.mode, RegistryMode::List);
        assert_eq!(
            r.last_error.as_deref(),
            Some("pg_cancel_backend returned false for PID 10")
        );
    }

    #[test]
    fn action_error_survives_next_refresh_but_fetch_error_does_not() {
        let mut r = registry_with(&[10]);
        r.handle_key(key(KeyCode::Char('t')));
        r.confirm();
        r.complete_action(Err("permission denied".into()));
        r.update_selection(procs(&[10]));
        assert_eq!(r.last_error.as_deref(), Some("permission denied"));

        r.record_fetch_error("connection reset".into());
        assert_eq!(r.processes.len(), 1);
        r.update_selection(procs(&[10]));
        assert!(r.last_error.is_none());
    }

    #[test]
    fn non_registry_keys_are_ignored() {
        let mut r = registry_with(&[10]);
        assert_eq!(r.handle_key(key(KeyCode::Char('x'))), RegistryOutcome::Ignored);
        assert_eq!(r.handle_key(key(KeyCode::Left)), RegistryOutcome::Ignored);
        r.open_detail();
        assert_eq!(r.handle_key(key(KeyCode::Char('q'))), RegistryOutcome::Ignored);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────────

    fn unique_pids(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
        prop::collection::hash_set(1i32..500, 0..max_len).prop_map(|s| s.into_iter().collect())
    }

    proptest! {
        #[test]
        fn present_pid_always_wins(
            first in unique_pids(30),
            second in unique_pids(30),
            pick in any::<prop::sample::Index>(),
        ) {
            prop_assume!(!first.is_empty());
            let mut r = registry_with(&first);
            let target = first[pick.index(first.len())];
            let idx = first.iter().position(|&p| p == target).unwrap();
            r.select(idx);

            let mut next = second.clone();
            if !next.contains(&target) {
                next.insert(next.len() / 2, target);
            }
            r.update_selection(procs(&next));
            prop_assert_eq!(r.selected_pid, target);
            prop_assert_eq!(next[r.selected_index], target);
        }

        #[test]
        fn absent_pid_clamps(
            first in unique_pids(30),
            second in unique_pids(30),
            pick in any::<prop::sample::Index>(),
        ) {
            prop_assume!(!first.is_empty());
            let mut r = registry_with(&first);
            let idx = pick.index(first.len());
            let target = first[idx];
            r.select(idx);

            let next: Vec<i32> = second.into_iter().filter(|&p| p != target).collect();
            r.update_selection(procs(&next));
            if next.is_empty() {
                prop_assert_eq!(r.selected_index, 0);
            } else {
                prop_assert_eq!(r.selected_index, idx.min(next.len() - 1));
                prop_assert_eq!(r.selected_pid, next[r.selected_index]);
            }
        }

        #[test]
        fn selection_stays_in_window(
            len in 1usize..80,
            height in 0u16..60,
            moves in prop::collection::vec(0u8..6, 0..40),
        ) {
            let pids: Vec<i32> = (1..=len as i32).collect();
            let mut r = registry_with(&pids);
            r.set_viewport_height(height);
            for m in moves {
                match m {
                    0 => r.select_next(),
                    1 => r.select_prev(),
                    2 => r.page_down(),
                    3 => r.page_up(),
                    4 => r.select_first(),
                    _ => r.select_last(),
                }
                let (start, end) = r.visible_range();
                prop_assert!(start <= r.selected_index && r.selected_index < end);
            }
        }
    }
}
