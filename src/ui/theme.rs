use ratatui::style::{Color, Modifier, Style};
use std::sync::{PoisonError, RwLock};

use crate::config::ThemeColors;

static ACTIVE_THEME: RwLock<ThemeColors> = RwLock::new(ThemeColors::TOKYO_NIGHT);

pub fn set_theme(colors: ThemeColors) {
    *ACTIVE_THEME.write().unwrap_or_else(PoisonError::into_inner) = colors;
}

fn read<T>(pick: impl FnOnce(&ThemeColors) -> T) -> T {
    pick(&ACTIVE_THEME.read().unwrap_or_else(PoisonError::into_inner))
}

pub struct Theme;

impl Theme {
    pub fn header_bg() -> Color {
        read(|t| t.header_bg)
    }

    pub fn fg() -> Color {
        read(|t| t.fg)
    }

    pub fn fg_dim() -> Color {
        read(|t| t.fg_dim)
    }

    pub fn border_active() -> Color {
        read(|t| t.border_active)
    }

    pub fn border_warn() -> Color {
        read(|t| t.border_warn)
    }

    pub fn border_danger() -> Color {
        read(|t| t.border_danger)
    }

    pub fn border_ok() -> Color {
        read(|t| t.border_ok)
    }

    pub fn border_dim() -> Color {
        read(|t| t.border_dim)
    }

    pub fn graph_connections() -> Color {
        read(|t| t.graph_connections)
    }

    pub fn graph_throughput() -> Color {
        read(|t| t.graph_throughput)
    }

    pub fn state_active() -> Color {
        read(|t| t.state_active)
    }

    pub fn state_idle_txn() -> Color {
        read(|t| t.state_idle_txn)
    }

    pub fn overlay_bg() -> Color {
        read(|t| t.overlay_bg)
    }

    pub fn highlight_bg() -> Color {
        read(|t| t.highlight_bg)
    }

    pub fn sql_keyword() -> Color {
        read(|t| t.sql_keyword)
    }

    pub fn sql_string() -> Color {
        read(|t| t.sql_string)
    }

    pub fn sql_number() -> Color {
        read(|t| t.sql_number)
    }

    pub fn sql_comment() -> Color {
        read(|t| t.sql_comment)
    }

    pub fn title_style() -> Style {
        Style::default()
            .fg(Self::fg())
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(color: Color) -> Style {
        Style::default().fg(color)
    }

    pub fn key_style() -> Style {
        Style::default()
            .fg(Self::border_active())
            .add_modifier(Modifier::BOLD)
    }

    pub fn state_color(state: &str) -> Color {
        match state {
            "active" => Self::state_active(),
            "idle in transaction" | "idle in transaction (aborted)" => Self::state_idle_txn(),
            _ => Self::fg(),
        }
    }
}
