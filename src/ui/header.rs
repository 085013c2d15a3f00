use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use super::util::format_age;
use crate::app::{App, Tab};

const TAB_SEPARATOR: &str = "│";

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let sep = Span::styled(" │ ", Style::default().fg(Theme::border_dim()));
    let plain = Style::default().fg(Theme::fg());
    let conn = &app.connection;

    let mut spans = vec![
        Span::styled(
            " pgmon ",
            Style::default()
                .fg(Theme::border_active())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(Theme::border_dim())),
        Span::styled(
            conn.profile.clone(),
            plain.add_modifier(Modifier::BOLD),
        ),
        sep.clone(),
        Span::styled(conn.target(), plain),
        sep.clone(),
        Span::styled(conn.user.clone(), plain),
    ];

    if let Some(ssl) = &conn.ssl_mode {
        spans.push(sep.clone());
        spans.push(Span::styled(ssl.clone(), Style::default().fg(Theme::fg_dim())));
    }
    if let Some(version) = &conn.server_version {
        spans.push(sep.clone());
        spans.push(Span::styled(format!("PG {version}"), Style::default().fg(Theme::fg_dim())));
    }

    spans.push(sep.clone());
    if app.is_loading() {
        spans.push(Span::styled(
            "⟳ loading",
            Style::default().fg(Theme::border_warn()),
        ));
    } else {
        let age = app.last_success.map_or_else(
            || "never".to_string(),
            |t| format_age(Instant::now().saturating_duration_since(t)),
        );
        spans.push(Span::styled(
            format!("refreshed {age}"),
            Style::default().fg(Theme::fg_dim()),
        ));
    }

    spans.push(sep);
    spans.push(Span::styled(
        format!(" {} ", app.mode.label()),
        Style::default()
            .fg(Theme::overlay_bg())
            .bg(Theme::border_active())
            .add_modifier(Modifier::BOLD),
    ));

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Theme::header_bg()));
    frame.render_widget(paragraph, area);
}

fn tab_label(tab: &Tab) -> String {
    format!(" {} ", tab.name())
}

/// Column span `[start, end)` of every tab label in the strip.
pub fn tab_ranges(tabs: &[Tab]) -> Vec<(u16, u16)> {
    let sep = TAB_SEPARATOR.width() as u16;
    let mut x: u16 = 0;
    let mut ranges = Vec::with_capacity(tabs.len());
    for (i, tab) in tabs.iter().enumerate() {
        if i > 0 {
            x = x.saturating_add(sep);
        }
        let width = u16::try_from(tab_label(tab).width()).unwrap_or(u16::MAX);
        let end = x.saturating_add(width);
        ranges.push((x, end));
        x = end;
    }
    ranges
}

/// Strip column shown at the left edge so the selected tab fits in `width`.
/// Always the start of a tab, and 0 while the selected tab fits unscrolled.
pub fn tab_offset(tabs: &[Tab], selected: usize, width: u16) -> u16 {
    let ranges = tab_ranges(tabs);
    let Some(&(selected_start, end)) = ranges.get(selected) else {
        return 0;
    };
    if end <= width {
        return 0;
    }
    ranges[..selected]
        .iter()
        .map(|&(start, _)| start)
        .find(|&start| end - start <= width)
        .unwrap_or(selected_start)
}

/// Tab under screen `column` when the strip is scrolled by `offset`.
pub fn tab_index_at(tabs: &[Tab], offset: u16, column: u16) -> Option<usize> {
    let column = column.saturating_add(offset);
    tab_ranges(tabs)
        .iter()
        .position(|&(start, end)| column >= start && column < end)
}

pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::with_capacity(app.tabs.len() * 2);
    for (i, tab) in app.tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(
                TAB_SEPARATOR,
                Style::default().fg(Theme::border_dim()),
            ));
        }
        let style = if i == app.selected {
            Style::default()
                .fg(Theme::fg())
                .bg(Theme::highlight_bg())
                .add_modifier(Modifier::BOLD)
        } else if tab.is_builtin() {
            Style::default().fg(Theme::border_active())
        } else {
            Style::default().fg(Theme::fg_dim())
        };
        spans.push(Span::styled(tab_label(tab), style));
    }
    let offset = tab_offset(&app.tabs, app.selected, area.width);
    frame.render_widget(Paragraph::new(Line::from(spans)).scroll((0, offset)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SavedQuery;

    fn tabs() -> Vec<Tab> {
        vec![
            Tab::Home,
            Tab::Active,
            Tab::Query(SavedQuery::new("Locks", "", "SELECT 1", Some(1))),
        ]
    }

    #[test]
    fn ranges_account_for_padding_and_separators() {
        // " Home " │ " Active " │ " Locks "
        assert_eq!(tab_ranges(&tabs()), vec![(0, 6), (7, 15), (16, 23)]);
    }

    #[test]
    fn index_at_column() {
        let tabs = tabs();
        assert_eq!(tab_index_at(&tabs, 0, 0), Some(0));
        assert_eq!(tab_index_at(&tabs, 0, 5), Some(0));
        assert_eq!(tab_index_at(&tabs, 0, 6), None);
        assert_eq!(tab_index_at(&tabs, 0, 7), Some(1));
        assert_eq!(tab_index_at(&tabs, 0, 22), Some(2));
        assert_eq!(tab_index_at(&tabs, 0, 40), None);
    }

    #[test]
    fn offset_is_zero_while_selected_tab_fits() {
        let tabs = tabs();
        assert_eq!(tab_offset(&tabs, 2, 80), 0);
        assert_eq!(tab_offset(&tabs, 2, 23), 0);
        assert_eq!(tab_offset(&tabs, 0, 6), 0);
    }

    #[test]
    fn offset_scrolls_to_the_selected_tab() {
        let tabs = tabs();
        assert_eq!(tab_offset(&tabs, 2, 12), 16);
        assert_eq!(tab_offset(&tabs, 1, 12), 7);
        assert_eq!(tab_offset(&tabs, 2, 16), 7);
        // Wider than the viewport: the selected tab's start stays on screen.
        assert_eq!(tab_offset(&tabs, 1, 4), 7);
    }

    #[test]
    fn index_at_column_with_offset() {
        let tabs = tabs();
        assert_eq!(tab_index_at(&tabs, 16, 2), Some(2));
        assert_eq!(tab_index_at(&tabs, 7, 0), Some(1));
        assert_eq!(tab_index_at(&tabs, 7, 8), None);
        assert_eq!(tab_index_at(&tabs, 7, 9), Some(2));
    }
}
