use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::theme::Theme;
use super::util::{scrub_newlines, truncate};
use crate::app::{App, Mode, RegistryMode};

/// Key hints for the current mode as (key, description) pairs.
pub fn hints(app: &App) -> Vec<(&'static str, &'static str)> {
    match &app.mode {
        Mode::Help => vec![("Esc", "close"), ("j/k", "scroll")],
        Mode::Search(_) => vec![("Enter", "open"), ("↑↓", "select"), ("Esc", "cancel")],
        Mode::Edit(editor) if editor.assist.is_some() => {
            let assist = editor.assist.as_ref();
            if assist.is_some_and(|a| a.response.is_some()) {
                vec![("c/y/Enter", "use SQL"), ("Esc", "discard")]
            } else {
                vec![("Enter", "generate"), ("Esc", "close")]
            }
        }
        Mode::Edit(_) => vec![
            ("Tab", "next field"),
            ("^S", "save"),
            ("^D", "delete"),
            ("^G", "generate"),
            ("Esc", "cancel"),
        ],
        Mode::Normal => match app.registry.as_ref().map(|r| r.mode) {
            Some(RegistryMode::Detail) => vec![
                ("Esc", "back"),
                ("y", "copy query"),
                ("c", "cancel query"),
                ("t", "terminate"),
            ],
            Some(RegistryMode::ConfirmTerminate) => vec![("y", "confirm"), ("n", "abort")],
            Some(RegistryMode::List) => vec![
                ("q", "quit"),
                ("←→", "tabs"),
                ("↑↓", "select"),
                ("Enter", "details"),
                ("c", "cancel"),
                ("t", "terminate"),
                ("?", "help"),
            ],
            None => vec![
                ("q", "quit"),
                ("←→", "tabs"),
                ("↑↓", "scroll"),
                ("r", "refresh"),
                ("/", "search"),
                ("e", "edit"),
                ("n", "new"),
                ("x", "psql"),
                ("?", "help"),
            ],
        },
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Theme::key_style();
    let sep_style = Style::default().fg(Theme::border_dim());
    let desc_style = Style::default().fg(Theme::fg());
    let width = area.width as usize;

    let status = if let Some(err) = &app.feedback.last_error {
        Line::from(Span::styled(
            truncate(&format!(" ERR: {}", scrub_newlines(err)), width),
            Style::default()
                .fg(Theme::border_danger())
                .add_modifier(Modifier::BOLD),
        ))
    } else if let Some(msg) = &app.feedback.status_message {
        Line::from(Span::styled(
            truncate(&format!(" {msg}"), width),
            Style::default().fg(Theme::border_ok()),
        ))
    } else {
        Line::from("")
    };

    let mut spans = Vec::new();
    for (i, (key, desc)) in hints(app).into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", sep_style));
        } else {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(format!(" {desc}"), desc_style));
    }

    let paragraph = Paragraph::new(vec![status, Line::from(spans)])
        .style(Style::default().bg(Theme::header_bg()));
    frame.render_widget(paragraph, area);
}
