//! Profile picker shown when no profile was named on the command line.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::profiles::ServiceFile;
use crate::ui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Continue,
    Select(String),
    EditFile,
    Quit,
}

pub struct Picker {
    pub path: PathBuf,
    pub profiles: Vec<String>,
    pub selected: usize,
    pub show_help: bool,
    pub error: Option<String>,
}

impl Picker {
    pub fn load(path: &Path) -> Self {
        let mut picker = Self {
            path: path.to_path_buf(),
            profiles: Vec::new(),
            selected: 0,
            show_help: false,
            error: None,
        };
        picker.reload();
        picker
    }

    /// Re-read the profile file, keeping the selection when the name survives.
    pub fn reload(&mut self) {
        let current = self.selected_name().map(str::to_string);
        match ServiceFile::load(&self.path) {
            Ok(file) => {
                self.profiles = file.list_profiles();
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "could not read profile file");
                self.profiles.clear();
                self.error = Some(e.to_string());
            }
        }
        self.selected = current
            .and_then(|name| self.profiles.iter().position(|p| *p == name))
            .unwrap_or(0)
            .min(self.profiles.len().saturating_sub(1));
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.profiles.get(self.selected).map(String::as_str)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerOutcome {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return PickerOutcome::Quit;
            }
            KeyCode::Esc | KeyCode::Char('q') => return PickerOutcome::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.profiles.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(name) = self.selected_name() {
                    return PickerOutcome::Select(name.to_string());
                }
            }
            KeyCode::Char('e') => return PickerOutcome::EditFile,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            _ => {}
        }
        PickerOutcome::Continue
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> PickerOutcome {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return PickerOutcome::Continue;
        }
        let Some(row) = mouse.row.checked_sub(ui::picker::LIST_TOP) else {
            return PickerOutcome::Continue;
        };
        match self.profiles.get(row as usize) {
            Some(name) => {
                self.selected = row as usize;
                PickerOutcome::Select(name.clone())
            }
            None => PickerOutcome::Continue,
        }
    }
}
