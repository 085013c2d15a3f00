use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use std::time::Duration;

use super::theme::Theme;

pub const ELLIPSIS: char = '…';

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 1 {
        return ELLIPSIS.to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Collapse every whitespace run (line breaks included) to one space and trim.
pub fn scrub_newlines(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn format_number(n: i64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn format_rate(rate: f64) -> String {
    if rate >= 100.0 {
        format!("{rate:.0}")
    } else {
        format!("{rate:.1}")
    }
}

/// "3s ago", "2m ago", "1h ago"
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

pub fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(Theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_style(Theme::border_active()))
}

/// Centered dim message inside `block`.
pub fn empty_state<'a>(message: &str, block: Block<'a>) -> Paragraph<'a> {
    Paragraph::new(message.to_string())
        .block(block)
        .style(Style::default().fg(Theme::fg_dim()))
        .alignment(Alignment::Center)
}
