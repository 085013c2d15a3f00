use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Cell, Row, Table};
use ratatui::Frame;

use super::theme::Theme;
use super::util::{empty_state, panel_block, truncate};
use crate::app::App;
use crate::db::models::NULL_MARKER;

/// Widest a single result column may grow before its cells are cut.
const MAX_COLUMN_WIDTH: usize = 40;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let name = app.current_tab().map_or("", |t| t.name());

    let Some(result) = &app.result else {
        let message = if app.is_loading() {
            "Loading..."
        } else if app.feedback.last_error.is_some() {
            "Query failed, see the error below"
        } else {
            "No data"
        };
        frame.render_widget(empty_state(message, panel_block(name)), area);
        return;
    };

    if result.is_empty() {
        let title = format!("{name} [0 rows]");
        frame.render_widget(empty_state("Query returned no rows", panel_block(&title)), area);
        return;
    }

    let total = result.rows.len();
    let start = app.result_scroll.min(total);
    let end = (start + app.viewport_rows).min(total);
    let title = if total > app.viewport_rows {
        format!("{name} [rows {}-{} of {total}]", start + 1, end)
    } else {
        format!("{name} [{total} rows]")
    };

    let widths: Vec<usize> = result
        .column_widths()
        .into_iter()
        .map(|w| w.clamp(1, MAX_COLUMN_WIDTH))
        .collect();

    let header = Row::new(
        result
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, &w)| Cell::from(truncate(c, w))),
    )
    .style(Theme::title_style());

    let null_style = Style::default()
        .fg(Theme::fg_dim())
        .add_modifier(Modifier::ITALIC);
    let rows: Vec<Row> = result.rows[start..end]
        .iter()
        .map(|row| {
            Row::new(row.iter().zip(&widths).map(|(cell, &w)| {
                let style = if cell == NULL_MARKER {
                    null_style
                } else {
                    Style::default().fg(Theme::fg())
                };
                Cell::from(truncate(cell, w)).style(style)
            }))
        })
        .collect();

    let constraints: Vec<Constraint> = widths
        .iter()
        .map(|&w| Constraint::Length(u16::try_from(w).unwrap_or(u16::MAX)))
        .collect();

    let table = Table::new(rows, constraints)
        .header(header)
        .block(panel_block(&title))
        .column_spacing(2);
    frame.render_widget(table, area);
}
