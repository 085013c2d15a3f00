use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use super::util::truncate;

fn dim(color: Color) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(r / 3, g / 3, b / 3),
        other => other,
    }
}

pub fn chart_block<'a>(title: &str, current_label: &str, color: Color) -> Block<'a> {
    let title_line = Line::from(vec![
        Span::styled(format!(" {title} "), Theme::title_style()),
        Span::styled(
            format!("({current_label}) "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ]);

    Block::default()
        .title(title_line)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

/// Filled braille line chart of `data`, oldest sample on the left.
pub fn render_line_chart(frame: &mut Frame, area: Rect, block: Block<'_>, data: &[u64], color: Color) {
    if data.is_empty() || area.width < 4 || area.height < 4 {
        frame.render_widget(block, area);
        return;
    }

    let max_val = data.iter().copied().max().unwrap_or(1).max(1) as f64;
    let y_ceil = nice_ceil(max_val);
    let x_max = (data.len() - 1).max(1) as f64;
    let fill_color = dim(color);
    let points: Vec<u64> = data.to_vec();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, x_max])
        .y_bounds([0.0, y_ceil])
        .paint(move |ctx| {
            for (i, &val) in points.iter().enumerate() {
                if val > 0 {
                    ctx.draw(&CanvasLine {
                        x1: i as f64,
                        y1: 0.0,
                        x2: i as f64,
                        y2: val as f64,
                        color: fill_color,
                    });
                }
            }
            for pair in points.windows(2).enumerate() {
                let (i, w) = pair;
                ctx.draw(&CanvasLine {
                    x1: i as f64,
                    y1: w[0] as f64,
                    x2: (i + 1) as f64,
                    y2: w[1] as f64,
                    color,
                });
            }
        });

    frame.render_widget(canvas, area);
}

/// One horizontal bar per `(label, value)`, scaled to the largest value.
pub fn render_bars(frame: &mut Frame, area: Rect, block: Block<'_>, bars: &[(String, i64)], color: Color) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let label_width = bars
        .iter()
        .map(|(label, _)| label.width())
        .max()
        .unwrap_or(0)
        .min(inner_width / 3);
    let value_width = bars
        .iter()
        .map(|(_, v)| v.to_string().len())
        .max()
        .unwrap_or(1);
    let max = bars.iter().map(|(_, v)| *v).max().unwrap_or(0);

    let lines: Vec<Line> = bars
        .iter()
        .map(|(label, value)| {
            let room = inner_width.saturating_sub(label_width + value_width + 3);
            let filled = bar_len(*value, max, room);
            Line::from(vec![
                Span::styled(
                    format!("{:<label_width$} ", truncate(label, label_width)),
                    Style::default().fg(Theme::state_color(label)),
                ),
                Span::styled("█".repeat(filled), Style::default().fg(color)),
                Span::styled(
                    format!(" {value:>value_width$}"),
                    Style::default().fg(Theme::fg()).add_modifier(Modifier::BOLD),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Bar length for `value` in a track of `room` cells; any non-zero value gets one cell.
pub fn bar_len(value: i64, max: i64, room: usize) -> usize {
    if value <= 0 || max <= 0 || room == 0 {
        return 0;
    }
    let len = (value as f64 / max as f64 * room as f64).round() as usize;
    len.clamp(1, room)
}

fn nice_ceil(val: f64) -> f64 {
    if val <= 0.0 {
        return 10.0;
    }
    let magnitude = 10.0_f64.powf(val.log10().floor());
    let normalized = val / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}
