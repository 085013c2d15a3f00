use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use crate::app::BackendAction;
use crate::db::models::ActiveProcess;
use crate::ui::theme::Theme;
use crate::ui::util::{scrub_newlines, truncate};

use super::{centered_rect, overlay_block, separator_line};

/// Query preview length inside the dialog.
const QUERY_PREVIEW: usize = 60;

fn button(key: &str, bg: Color) -> Span<'static> {
    Span::styled(
        format!(" {key} "),
        Style::default()
            .fg(Theme::overlay_bg())
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )
}

fn confirm_abort_buttons(confirm_color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled("  ", Style::default()),
        button("y", confirm_color),
        Span::styled(" confirm    ", Style::default().fg(Theme::fg_dim())),
        button("n", Theme::border_dim()),
        Span::styled(" abort", Style::default().fg(Theme::fg_dim())),
    ])
}

fn render_dialog(
    frame: &mut Frame,
    area: Rect,
    width: u16,
    height: u16,
    title: &str,
    border_color: Color,
    lines: Vec<Line<'static>>,
) {
    let popup = centered_rect(width, height, area);
    frame.render_widget(Clear, popup);

    let paragraph = Paragraph::new(lines)
        .block(overlay_block(title, border_color))
        .alignment(Alignment::Left);
    frame.render_widget(paragraph, popup);
}

/// Lines of the terminate/cancel dialog, without the frame.
pub fn confirm_lines(process: &ActiveProcess, action: BackendAction, in_flight: bool) -> Vec<Line<'static>> {
    let color = match action {
        BackendAction::Terminate => Theme::border_danger(),
        BackendAction::Cancel => Theme::border_warn(),
    };
    let dim = Style::default().fg(Theme::fg_dim());
    let text = Style::default().fg(Theme::fg());

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", action.confirm_prompt(process.pid)),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  User:     ", dim),
            Span::styled(process.username.clone(), text),
        ]),
        Line::from(vec![
            Span::styled("  Database: ", dim),
            Span::styled(process.database.clone(), text),
        ]),
        Line::from(vec![
            Span::styled("  Query:    ", dim),
            Span::styled(truncate(&scrub_newlines(&process.query), QUERY_PREVIEW), text),
        ]),
        Line::from(""),
        separator_line(),
    ];

    if in_flight {
        lines.push(Line::from(Span::styled(
            "  Waiting for the server...",
            Style::default().fg(Theme::border_warn()),
        )));
    } else {
        lines.push(confirm_abort_buttons(color));
    }
    lines
}

pub fn render_confirm_backend(
    frame: &mut Frame,
    process: &ActiveProcess,
    action: BackendAction,
    in_flight: bool,
    area: Rect,
) {
    let (title, color) = match action {
        BackendAction::Terminate => ("Terminate Backend", Theme::border_danger()),
        BackendAction::Cancel => ("Cancel Query", Theme::border_warn()),
    };
    let lines = confirm_lines(process, action, in_flight);
    render_dialog(frame, area, 70, 50, title, color, lines);
}
