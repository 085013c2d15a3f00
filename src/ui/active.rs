use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use super::overlay::{highlight_sql, highlight_sql_inline, render_confirm_backend};
use super::theme::Theme;
use super::util::{empty_state, panel_block, scrub_newlines, truncate};
use crate::app::{ProcessRegistry, RegistryMode};
use crate::db::models::ActiveProcess;

/// PID, User, State, Duration, Wait; the query column takes what is left.
const FIXED_WIDTHS: [usize; 5] = [8, 12, 12, 12, 16];
const MIN_QUERY_WIDTH: usize = 20;

pub fn query_width(area_width: u16) -> usize {
    let fixed: usize = FIXED_WIDTHS.iter().sum::<usize>() + FIXED_WIDTHS.len();
    (area_width.saturating_sub(2) as usize)
        .saturating_sub(fixed)
        .max(MIN_QUERY_WIDTH)
}

pub fn wait_label(p: &ActiveProcess) -> String {
    match (p.wait_event_type.is_empty(), p.wait_event.is_empty()) {
        (true, true) => String::new(),
        (false, false) => format!("{}:{}", p.wait_event_type, p.wait_event),
        (true, false) => p.wait_event.clone(),
        (false, true) => p.wait_event_type.clone(),
    }
}

/// "showing a-b of n", 1-based and inclusive.
pub fn range_label(registry: &ProcessRegistry) -> String {
    let total = registry.processes.len();
    let (start, end) = registry.visible_range();
    if total == 0 {
        return "showing 0 of 0".to_string();
    }
    format!("showing {}-{} of {total}", start + 1, end)
}

pub fn render(frame: &mut Frame, registry: &ProcessRegistry, area: Rect) {
    match registry.mode {
        RegistryMode::List => render_list(frame, registry, area),
        RegistryMode::Detail => render_detail(frame, registry, area),
        RegistryMode::ConfirmTerminate => {
            render_list(frame, registry, area);
            if let (Some(process), Some(action)) = (&registry.detail, registry.pending_action) {
                render_confirm_backend(frame, process, action, registry.action_in_flight, area);
            }
        }
    }
}

fn render_list(frame: &mut Frame, registry: &ProcessRegistry, area: Rect) {
    let (area, error_area) = match &registry.last_error {
        Some(_) => {
            let [body, err] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
            (body, Some(err))
        }
        None => (area, None),
    };
    if let (Some(err_area), Some(err)) = (error_area, &registry.last_error) {
        let line = Line::from(Span::styled(
            truncate(&format!(" {}", scrub_newlines(err)), err_area.width as usize),
            Style::default().fg(Theme::border_danger()),
        ));
        frame.render_widget(Paragraph::new(line), err_area);
    }

    let block = panel_block("Active Connections").title_bottom(Line::from(Span::styled(
        format!(" {} ", range_label(registry)),
        Style::default().fg(Theme::fg_dim()),
    )));

    if registry.processes.is_empty() {
        frame.render_widget(empty_state("No active (non-idle) connections", block), area);
        return;
    }

    let query_w = query_width(area.width);
    let header = Row::new(["PID", "User", "State", "Duration", "Wait", "Query"].map(Cell::from))
        .style(Theme::title_style());

    let (start, end) = registry.visible_range();
    let rows: Vec<Row> = registry.processes[start..end]
        .iter()
        .enumerate()
        .map(|(offset, p)| {
            let cell = |text: &str, width: usize| truncate(&scrub_newlines(text), width);
            let row = Row::new(vec![
                Cell::from(cell(&p.pid.to_string(), FIXED_WIDTHS[0])),
                Cell::from(cell(&p.username, FIXED_WIDTHS[1])),
                Cell::from(cell(&p.state, FIXED_WIDTHS[2]))
                    .style(Style::default().fg(Theme::state_color(&p.state))),
                Cell::from(cell(&p.duration, FIXED_WIDTHS[3])),
                Cell::from(cell(&wait_label(p), FIXED_WIDTHS[4])),
                Cell::from(Line::from(highlight_sql_inline(&p.query, query_w))),
            ]);
            if start + offset == registry.selected_index {
                row.style(
                    Style::default()
                        .bg(Theme::highlight_bg())
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row.style(Style::default().fg(Theme::fg()))
            }
        })
        .collect();

    let widths = FIXED_WIDTHS
        .iter()
        .map(|&w| Constraint::Length(w as u16))
        .chain([Constraint::Min(MIN_QUERY_WIDTH as u16)]);
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);
    frame.render_widget(table, area);
}

fn render_detail(frame: &mut Frame, registry: &ProcessRegistry, area: Rect) {
    let Some(p) = &registry.detail else {
        render_list(frame, registry, area);
        return;
    };

    let title = if registry.detail_live {
        format!("Process {}", p.pid)
    } else {
        format!("Process {} (ended)", p.pid)
    };
    let block = panel_block(&title);

    let key_style = Style::default().fg(Theme::fg_dim());
    let value_style = Style::default().fg(Theme::fg());
    let field = |label: &str, value: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {label:<14}"), key_style),
            Span::styled(value.to_string(), value_style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("PID", &p.pid.to_string()),
        field("User", &p.username),
        field("Database", &p.database),
        field("Client", &p.client_addr),
        field("Backend type", &p.backend_type),
        Line::from(vec![
            Span::styled(format!("  {:<14}", "State"), key_style),
            Span::styled(p.state.clone(), Style::default().fg(Theme::state_color(&p.state))),
        ]),
        field("Query start", &p.query_start),
        field("Duration", &p.duration),
        field("Wait", &wait_label(p)),
        Line::from(""),
        Line::from(Span::styled("  Query", Theme::title_style())),
    ];
    lines.extend(highlight_sql(&p.query, "    "));

    if let Some(status) = &registry.copy_status {
        let color = if status.starts_with("Copy failed") {
            Theme::border_danger()
        } else {
            Theme::border_ok()
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {status}"), Style::default().fg(color))));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: i32) -> ActiveProcess {
        ActiveProcess {
            pid,
            state: "active".into(),
            query: "SELECT 1".into(),
            ..ActiveProcess::default()
        }
    }

    #[test]
    fn query_column_takes_remaining_width() {
        assert_eq!(query_width(120), 120 - 2 - 60 - 5);
        assert_eq!(query_width(40), MIN_QUERY_WIDTH);
    }

    #[test]
    fn wait_label_joins_type_and_event() {
        let mut p = process(1);
        assert_eq!(wait_label(&p), "");
        p.wait_event_type = "Lock".into();
        p.wait_event = "relation".into();
        assert_eq!(wait_label(&p), "Lock:relation");
    }

    #[test]
    fn range_label_is_one_based() {
        let mut registry = ProcessRegistry::new();
        assert_eq!(range_label(&registry), "showing 0 of 0");
        registry.update_selection((1..=3).map(process).collect());
        assert_eq!(range_label(&registry), "showing 1-3 of 3");
    }
}
