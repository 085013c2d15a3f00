mod confirm;
mod editor;
mod help;
mod search;
mod sql_highlight;

pub use confirm::render_confirm_backend;
pub use editor::render_editor;
pub use help::render_help;
pub use search::render_search;
pub use sql_highlight::{highlight_sql, highlight_sql_inline};

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders};

use super::theme::Theme;

/// Rect of `percent_x` by `percent_y` of `area`, centered.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

pub(crate) fn overlay_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(
            Style::default()
                .fg(Theme::overlay_bg())
                .bg(color)
                .add_modifier(Modifier::BOLD),
        )
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Theme::overlay_bg()))
}

pub(crate) fn section_header(title: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {title} "),
            Style::default()
                .fg(Theme::border_warn())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "─".repeat(40),
            Style::default().fg(Theme::border_dim()),
        ),
    ])
}

pub(crate) fn separator_line() -> Line<'static> {
    Line::from(Span::styled(
        format!("  {}", "─".repeat(50)),
        Style::default().fg(Theme::border_dim()),
    ))
}
