use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen row of the tab strip; mouse clicks are matched against it.
pub const TAB_ROW: u16 = 1;

const HEADER_ROWS: u16 = 1;
const TAB_ROWS: u16 = 1;
const FOOTER_ROWS: u16 = 2;
/// Table border (2) plus the column header row.
const TABLE_CHROME: u16 = 3;

pub struct LayoutAreas {
    pub header: Rect,
    pub tabs: Rect,
    pub body: Rect,
    pub footer: Rect,
}

pub fn compute_layout(area: Rect) -> LayoutAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Length(TAB_ROWS),
            Constraint::Min(0),
            Constraint::Length(FOOTER_ROWS),
        ])
        .split(area);

    LayoutAreas {
        header: rows[0],
        tabs: rows[1],
        body: rows[2],
        footer: rows[3],
    }
}

/// Data rows that fit in the result table for a terminal of `height` rows.
pub fn result_viewport_rows(height: u16) -> usize {
    height
        .saturating_sub(HEADER_ROWS + TAB_ROWS + FOOTER_ROWS + TABLE_CHROME)
        .max(1) as usize
}

/// Home body split: bar chart left, sparkline right.
pub fn split_home(area: Rect) -> (Rect, Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    (cols[0], cols[1])
}
