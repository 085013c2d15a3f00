use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown in place of SQL NULL in result cells.
pub const NULL_MARKER: &str = "NULL";

/// A fully materialized result set with every cell already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display width of each column: the widest of header and cells.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| unicode_width::UnicodeWidthStr::width(c.as_str()))
            .collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let w = unicode_width::UnicodeWidthStr::width(cell.as_str());
                match widths.get_mut(i) {
                    Some(slot) => *slot = (*slot).max(w),
                    None => widths.push(w),
                }
            }
        }
        widths
    }
}

/// Normalize one cell: NULL becomes the marker and line breaks become spaces.
pub fn render_cell(value: Option<&str>) -> String {
    match value {
        None => NULL_MARKER.to_string(),
        Some(text) => text.replace("\r\n", " ").replace(['\n', '\r'], " "),
    }
}

/// One non-idle backend as seen in `pg_stat_activity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProcess {
    pub pid: i32,
    pub username: String,
    pub database: String,
    pub client_addr: String,
    pub state: String,
    pub query_start: String,
    pub duration: String,
    pub wait_event: String,
    pub wait_event_type: String,
    pub query: String,
    pub backend_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    pub state: String,
    pub count: i64,
}

/// Data behind the Home tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeSnapshot {
    pub timestamp: DateTime<Utc>,
    pub states: Vec<StateCount>,
    pub total_commits: i64,
}

impl HomeSnapshot {
    pub fn total_connections(&self) -> i64 {
        self.states.iter().map(|s| s.count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
}

impl ServerInfo {
    /// Major version number (e.g. 16 from "16.2 (Debian 16.2-1)").
    pub fn major_version(&self) -> Option<u32> {
        self.version
            .split(|c: char| c == '.' || c.is_whitespace())
            .next()
            .and_then(|v| v.parse().ok())
    }
}
