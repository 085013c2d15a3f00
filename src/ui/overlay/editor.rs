use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::{parse_order, AssistState, EditorField, EditorState, OrderInput, TextInput};
use crate::ui::theme::Theme;

use super::{centered_rect, highlight_sql, overlay_block};

const LABEL_WIDTH: usize = 13;

/// Display width of the text left of the cursor on its line.
fn cursor_offset(input: &TextInput) -> u16 {
    let (line, col) = input.cursor_line_col();
    let text = input.value.split('\n').nth(line).unwrap_or("");
    let before: String = text.chars().take(col).collect();
    u16::try_from(before.width()).unwrap_or(u16::MAX)
}

fn order_hint(editor: &EditorState) -> (&'static str, Style) {
    match parse_order(&editor.order.value) {
        OrderInput::Empty => ("empty hides the tab", Style::default().fg(Theme::fg_dim())),
        OrderInput::Value(_) => ("", Style::default()),
        OrderInput::Invalid => (
            "not a number, the stored order is kept",
            Style::default().fg(Theme::border_warn()),
        ),
    }
}

fn field_line(editor: &EditorState, field: EditorField) -> Line<'static> {
    let focused = editor.focus == field;
    let label_style = if focused {
        Theme::key_style()
    } else {
        Style::default().fg(Theme::fg_dim())
    };
    let mut spans = vec![
        Span::styled(format!(" {:<LABEL_WIDTH$}", field.label()), label_style),
        Span::styled(editor.field(field).value.clone(), Style::default().fg(Theme::fg())),
    ];
    if field == EditorField::Order {
        let (hint, style) = order_hint(editor);
        if !hint.is_empty() {
            spans.push(Span::styled(format!("  ({hint})"), style));
        }
    }
    Line::from(spans)
}

pub fn render_editor(frame: &mut Frame, editor: &EditorState, area: Rect) {
    let popup = centered_rect(80, 85, area);
    frame.render_widget(Clear, popup);

    let title = match &editor.original_name {
        None => "New Query".to_string(),
        Some(name) => format!("Edit Query: {name}"),
    };
    let block = overlay_block(&title, Theme::border_active());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [name_area, desc_area, order_area, sql_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    for (field, row) in [
        (EditorField::Name, name_area),
        (EditorField::Description, desc_area),
        (EditorField::Order, order_area),
    ] {
        frame.render_widget(Paragraph::new(field_line(editor, field)), row);
    }

    let sql_color = if editor.focus == EditorField::Sql {
        Theme::border_active()
    } else {
        Theme::border_dim()
    };
    let sql_block = Block::default()
        .title(" SQL ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(sql_color));
    let sql_inner = sql_block.inner(sql_area);
    let (cursor_line, _) = editor.sql.cursor_line_col();
    let scroll = u16::try_from(cursor_line)
        .unwrap_or(u16::MAX)
        .saturating_sub(sql_inner.height.saturating_sub(1));
    frame.render_widget(
        Paragraph::new(highlight_sql(&editor.sql.value, ""))
            .block(sql_block)
            .scroll((scroll, 0)),
        sql_area,
    );

    let hint = Line::from(Span::styled(
        " Tab next field · Ctrl+S save · Ctrl+D delete · Ctrl+G generate · Esc cancel",
        Style::default().fg(Theme::fg_dim()),
    ));
    frame.render_widget(Paragraph::new(hint), hint_area);

    if let Some(assist) = &editor.assist {
        render_assist(frame, assist, area);
        return;
    }

    let cursor = match editor.focus {
        EditorField::Sql => {
            let line = u16::try_from(cursor_line).unwrap_or(u16::MAX);
            (
                sql_inner.x.saturating_add(cursor_offset(&editor.sql)),
                sql_inner.y.saturating_add(line.saturating_sub(scroll)),
            )
        }
        field => {
            let row = match field {
                EditorField::Name => name_area,
                EditorField::Description => desc_area,
                _ => order_area,
            };
            (
                row.x + 1 + LABEL_WIDTH as u16 + cursor_offset(editor.field(field)),
                row.y,
            )
        }
    };
    frame.set_cursor_position(cursor);
}

fn render_assist(frame: &mut Frame, assist: &AssistState, area: Rect) {
    let popup = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup);

    let block = overlay_block("Generate SQL", Theme::border_warn());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [prompt_area, body_area, hint_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let prompt = Line::from(vec![
        Span::styled(" Describe the query: ", Theme::key_style()),
        Span::styled(assist.prompt.value.clone(), Style::default().fg(Theme::fg())),
    ]);
    frame.render_widget(Paragraph::new(prompt).wrap(Wrap { trim: false }), prompt_area);

    let (body, hint): (Vec<Line>, &str) = if assist.in_flight {
        (
            vec![Line::from(Span::styled(
                " Generating...",
                Style::default()
                    .fg(Theme::border_warn())
                    .add_modifier(Modifier::ITALIC),
            ))],
            " Esc cancel",
        )
    } else if let Some(sql) = &assist.response {
        (highlight_sql(sql, " "), " c/y/Enter use this SQL · Esc discard")
    } else {
        (Vec::new(), " Enter generate · Esc close")
    };
    frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), body_area);
    frame.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(Theme::fg_dim()))),
        hint_area,
    );

    if !assist.is_locked() {
        let x = prompt_area.x + 21 + cursor_offset(&assist.prompt);
        frame.set_cursor_position((x.min(prompt_area.right().saturating_sub(1)), prompt_area.y));
    }
}
