use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::theme::Theme;
use crate::picker::Picker;

/// Screen row of the first profile entry.
pub const LIST_TOP: u16 = 3;

pub fn render(frame: &mut Frame, picker: &Picker, area: Rect) {
    let [title_area, path_area, _, list_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(LIST_TOP - 2),
        Constraint::Min(1),
        Constraint::Length(if picker.show_help { 2 } else { 1 }),
    ])
    .areas(area);

    let title = Line::from(vec![
        Span::styled(
            " pgmon ",
            Style::default()
                .fg(Theme::border_active())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(Theme::border_dim())),
        Span::styled("Select a connection profile", Style::default().fg(Theme::fg())),
    ]);
    frame.render_widget(
        Paragraph::new(title).style(Style::default().bg(Theme::header_bg())),
        title_area,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!(" {}", picker.path.display()),
            Style::default().fg(Theme::fg_dim()),
        )),
        path_area,
    );

    let lines: Vec<Line> = if let Some(err) = &picker.error {
        vec![Line::from(Span::styled(
            format!(" {err}"),
            Style::default().fg(Theme::border_danger()),
        ))]
    } else if picker.profiles.is_empty() {
        vec![Line::from(Span::styled(
            format!(" No services found in {}", picker.path.display()),
            Style::default().fg(Theme::fg_dim()),
        ))]
    } else {
        picker
            .profiles
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == picker.selected {
                    Line::from(Span::styled(
                        format!(" ▸ {name}"),
                        Style::default()
                            .fg(Theme::fg())
                            .bg(Theme::highlight_bg())
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(format!("   {name}"), Style::default().fg(Theme::fg())))
                }
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(lines), list_area);

    let key_style = Theme::key_style();
    let desc_style = Style::default().fg(Theme::fg());
    let sep_style = Style::default().fg(Theme::border_dim());
    let mut footer = vec![Line::from(vec![
        Span::styled(" Enter", key_style),
        Span::styled(" connect", desc_style),
        Span::styled(" │ ", sep_style),
        Span::styled("e", key_style),
        Span::styled(" edit file", desc_style),
        Span::styled(" │ ", sep_style),
        Span::styled("?", key_style),
        Span::styled(" help", desc_style),
        Span::styled(" │ ", sep_style),
        Span::styled("q", key_style),
        Span::styled(" quit", desc_style),
    ])];
    if picker.show_help {
        footer.push(Line::from(Span::styled(
            " ↑↓/j k move, Enter/Space or click connects, e opens $EDITOR on the profile file",
            Style::default().fg(Theme::fg_dim()),
        )));
    }
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().bg(Theme::header_bg())),
        footer_area,
    );
}
