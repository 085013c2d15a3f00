use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;
use crate::ui::util::{scrub_newlines, truncate};

/// Words styled as keywords, matched case-insensitively.
pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "IN", "IS", "NULL", "AS",
    "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "FULL", "CROSS", "ON", "USING",
    "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "TRUNCATE",
    "CREATE", "ALTER", "DROP", "TABLE", "INDEX", "VIEW", "SCHEMA",
    "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "UNIQUE", "DEFAULT",
    "BEGIN", "COMMIT", "ROLLBACK", "END",
    "ORDER", "BY", "ASC", "DESC", "NULLS", "FIRST", "LAST",
    "GROUP", "HAVING", "LIMIT", "OFFSET", "FETCH", "ROWS", "ONLY",
    "UNION", "INTERSECT", "EXCEPT", "ALL", "DISTINCT", "EXISTS",
    "CASE", "WHEN", "THEN", "ELSE", "COALESCE", "NULLIF", "CAST",
    "TRUE", "FALSE", "LIKE", "ILIKE", "BETWEEN", "ANY",
    "WITH", "RECURSIVE", "RETURNING", "CONFLICT", "DO", "NOTHING",
    "OVER", "PARTITION", "WINDOW", "FILTER", "LATERAL", "INTERVAL",
    "FOR", "SHARE", "NOWAIT", "SKIP", "LOCKED",
    "EXPLAIN", "ANALYZE", "VERBOSE", "BUFFERS",
    "VACUUM", "REINDEX", "CLUSTER", "REFRESH", "MATERIALIZED", "CONCURRENTLY",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Keyword,
    Str,
    Number,
    Comment,
    Plain,
}

impl Token {
    fn style(self) -> Style {
        let fg = match self {
            Self::Keyword => Theme::sql_keyword(),
            Self::Str => Theme::sql_string(),
            Self::Number => Theme::sql_number(),
            Self::Comment => Theme::sql_comment(),
            Self::Plain => Theme::fg(),
        };
        Style::default().fg(fg)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `text` into styled runs. Line breaks stay inside the runs.
fn tokenize(text: &str) -> Vec<(Token, String)> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let at = |i: usize| chars.get(i).copied();
    let mut out: Vec<(Token, String)> = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let start = i;

        let kind = if c == '-' && at(i + 1) == Some('-') {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            Token::Comment
        } else if c == '/' && at(i + 1) == Some('*') {
            i += 2;
            while i < len && !(chars[i] == '*' && at(i + 1) == Some('/')) {
                i += 1;
            }
            i = (i + 2).min(len);
            Token::Comment
        } else if c == '\'' {
            i += 1;
            while i < len {
                if chars[i] == '\'' {
                    if at(i + 1) == Some('\'') {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            Token::Str
        } else if c == '$' && at(i + 1).is_some_and(|n| n.is_ascii_digit()) {
            i += 1;
            while i < len && chars[i].is_ascii_digit() {
                i += 1;
            }
            Token::Plain
        } else if c.is_ascii_digit() || (c == '.' && at(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            Token::Number
        } else if c.is_alphabetic() || c == '_' {
            while i < len && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if SQL_KEYWORDS.contains(&word.to_uppercase().as_str()) {
                Token::Keyword
            } else {
                Token::Plain
            }
        } else {
            i += 1;
            Token::Plain
        };

        let piece: String = chars[start..i].iter().collect();
        match out.last_mut() {
            Some((last, text)) if *last == Token::Plain && kind == Token::Plain => text.push_str(&piece),
            _ => out.push((kind, piece)),
        }
    }
    out
}

/// Single-line highlight for list cells: whitespace collapsed, cut to `max_len`.
pub fn highlight_sql_inline(text: &str, max_len: usize) -> Vec<Span<'static>> {
    let display = truncate(&scrub_newlines(text), max_len);
    tokenize(&display)
        .into_iter()
        .map(|(kind, s)| Span::styled(s, kind.style()))
        .collect()
}

/// Multi-line highlight; every output line starts with `indent`.
pub fn highlight_sql(text: &str, indent: &str) -> Vec<Line<'static>> {
    let plain = Token::Plain.style();
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = vec![Span::styled(indent.to_string(), plain)];

    for (kind, run) in tokenize(text) {
        let mut parts = run.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                current.push(Span::styled(part.trim_end_matches('\r').to_string(), kind.style()));
            }
            if parts.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
                current.push(Span::styled(indent.to_string(), plain));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}
