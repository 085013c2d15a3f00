//! Top-level session modes and the tab model.

use super::editor::EditorState;
use super::search::SearchState;
use crate::store::SavedQuery;

pub const HOME_TAB: &str = "Home";
pub const ACTIVE_TAB: &str = "Active";

/// One entry of the tab strip or the search candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tab {
    Home,
    Active,
    Query(SavedQuery),
}

impl Tab {
    pub fn name(&self) -> &str {
        match self {
            Self::Home => HOME_TAB,
            Self::Active => ACTIVE_TAB,
            Self::Query(q) => &q.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Home => "Connection counts and transaction throughput",
            Self::Active => "Non-idle backend processes",
            Self::Query(q) => &q.description,
        }
    }

    /// Built-in tabs are synthesized per session and never stored.
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Home | Self::Active)
    }

    pub const fn as_query(&self) -> Option<&SavedQuery> {
        match self {
            Self::Query(q) => Some(q),
            _ => None,
        }
    }
}

/// Mutually exclusive input modes.
#[derive(Debug, Clone, Default)]
pub enum Mode {
    #[default]
    Normal,
    Help,
    Search(SearchState),
    Edit(EditorState),
}

impl Mode {
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Help => "HELP",
            Self::Search(_) => "SEARCH",
            Self::Edit(e) if e.assist.is_some() => "ASSIST",
            Self::Edit(_) => "EDIT",
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    SwitchProfile,
}
