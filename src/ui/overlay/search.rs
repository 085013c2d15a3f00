use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use crate::app::{App, SearchState, Tab};
use crate::ui::theme::Theme;
use crate::ui::util::truncate;

use super::{centered_rect, highlight_sql_inline, overlay_block};

fn is_hidden(app: &App, tab: &Tab) -> bool {
    tab.as_query().is_some_and(|q| app.effective_order(q).is_none())
}

pub fn render_search(frame: &mut Frame, app: &App, search: &SearchState, area: Rect) {
    let popup = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup);

    let title = format!("Search [{}/{}]", search.matches.len(), app.candidates.len());
    let block = overlay_block(&title, Theme::border_active());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [input_area, list_area, preview_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let input = Line::from(vec![
        Span::styled(" / ", Theme::key_style()),
        Span::styled(search.text.clone(), Style::default().fg(Theme::fg())),
        Span::styled("▏", Style::default().fg(Theme::border_active())),
    ]);
    frame.render_widget(Paragraph::new(input), input_area);

    let rows = list_area.height as usize;
    let first = search.selected.saturating_sub(rows.saturating_sub(1));
    let width = list_area.width as usize;
    let name_width = 28.min(width / 2);

    let lines: Vec<Line> = search
        .matches
        .iter()
        .enumerate()
        .skip(first)
        .take(rows)
        .filter_map(|(pos, &idx)| app.candidates.get(idx).map(|tab| (pos, tab)))
        .map(|(pos, tab)| {
            let marker = if is_hidden(app, tab) { " (hidden)" } else { "" };
            let selected = pos == search.selected;
            let base = if selected {
                Style::default()
                    .bg(Theme::highlight_bg())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let desc_room = width.saturating_sub(name_width + marker.len() + 3);
            Line::from(vec![
                Span::styled(
                    format!(" {:<name_width$}", truncate(tab.name(), name_width)),
                    base.fg(Theme::fg()),
                ),
                Span::styled(marker, base.fg(Theme::border_warn())),
                Span::styled(
                    format!("  {}", truncate(tab.description(), desc_room)),
                    base.fg(Theme::fg_dim()),
                ),
            ])
        })
        .collect();

    if lines.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(" No matching queries", Style::default().fg(Theme::fg_dim()))),
            list_area,
        );
    } else {
        frame.render_widget(Paragraph::new(lines), list_area);
    }

    let preview = search
        .highlighted()
        .and_then(|idx| app.candidates.get(idx))
        .and_then(Tab::as_query)
        .map(|q| highlight_sql_inline(&q.sql, preview_area.width.saturating_sub(1) as usize))
        .unwrap_or_default();
    let mut spans = vec![Span::raw(" ")];
    spans.extend(preview);
    frame.render_widget(Paragraph::new(Line::from(spans)), preview_area);
}
