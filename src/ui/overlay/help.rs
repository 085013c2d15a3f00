use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::ui::theme::Theme;

use super::{centered_rect, overlay_block, section_header};

pub fn help_lines(app: &App) -> Vec<Line<'static>> {
    let key_style = Theme::key_style();
    let desc_style = Style::default().fg(Theme::fg());

    let entry = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("    {key:<14}"), key_style),
            Span::styled(desc.to_string(), desc_style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        section_header("Session"),
        entry("q / Esc", "Quit"),
        entry("Ctrl+C", "Quit"),
        entry("c", "Switch connection profile"),
        entry("?", "This help screen"),
        entry("x", "Open psql on this connection"),
        Line::from(""),
        section_header("Tabs"),
        entry("← / h", "Previous tab"),
        entry("→ / l", "Next tab"),
        entry("click", "Select the tab under the pointer"),
        entry("s / /", "Search all queries, hidden ones included"),
        entry("Enter / r", "Refresh now"),
        Line::from(""),
        section_header("Results"),
        entry("↑↓ / j k", "Scroll one row"),
        entry("PgUp / PgDn", "Scroll half a page"),
        entry("Home / End", "Top / bottom"),
        Line::from(""),
        section_header("Queries"),
        entry("e", "Edit the current query"),
        entry("n", "New query"),
        entry("d", "Dump all queries to a JSON file"),
    ];

    lines.extend([
        Line::from(""),
        section_header("Active tab"),
        entry("↑↓ / j k", "Select process"),
        entry("g / G", "First / last process"),
        entry("Enter", "Process details"),
        entry("c", "Cancel the running query"),
        entry("t", "Terminate the backend"),
        entry("y", "Copy query (details view)"),
    ]);
    if app.on_active_tab() {
        lines.push(Line::from(Span::styled(
            "    In the process list, c cancels instead of switching profile.",
            Style::default().fg(Theme::fg_dim()),
        )));
    }

    lines.extend([
        Line::from(""),
        section_header("Editor"),
        entry("Tab / S-Tab", "Next / previous field"),
        entry("Ctrl+S", "Save"),
        entry("Ctrl+D", "Delete"),
        entry("Ctrl+G", "Generate SQL from a description"),
        entry("Esc", "Cancel"),
        Line::from(""),
        section_header("Overlay"),
        entry("Esc / q", "Close"),
        entry("j / k", "Scroll line"),
        entry("Ctrl+d/u", "Scroll page"),
        entry("g / G", "Top / bottom"),
    ]);
    lines
}

pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(70, 80, area);
    frame.render_widget(Clear, popup);

    let block = overlay_block("Keybindings  [j/k] scroll  [Esc] close", Theme::border_active());
    let lines = help_lines(app);

    // Keep at least one page of content on screen
    let visible = popup.height.saturating_sub(2);
    let max_scroll = u16::try_from(lines.len())
        .unwrap_or(u16::MAX)
        .saturating_sub(visible);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.overlay_scroll.min(max_scroll), 0));
    frame.render_widget(paragraph, popup);
}
