use ratatui::layout::Rect;
use ratatui::Frame;

use super::graph::{chart_block, render_bars, render_line_chart};
use super::layout::split_home;
use super::theme::Theme;
use super::util::{empty_state, format_rate};
use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (left, right) = split_home(area);

    match &app.home {
        Some(snap) => {
            let total = snap.total_connections().to_string();
            let block = chart_block("Connections", &total, Theme::graph_connections());
            let bars: Vec<(String, i64)> = snap
                .states
                .iter()
                .map(|s| (s.state.clone(), s.count))
                .collect();
            render_bars(frame, left, block, &bars, Theme::graph_connections());
        }
        None => {
            let block = chart_block("Connections", "-", Theme::graph_connections());
            let message = if app.is_loading() { "Loading..." } else { "No data yet..." };
            frame.render_widget(empty_state(message, block), left);
        }
    }

    let color = Theme::graph_throughput();
    match app.throughput.current {
        Some(rate) => {
            let block = chart_block("Transactions/sec", &format_rate(rate), color);
            render_line_chart(frame, right, block, &app.throughput.samples.as_vec(), color);
        }
        None => {
            let block = chart_block("Transactions/sec", "-", color);
            frame.render_widget(empty_state("No data yet...", block), right);
        }
    }
}
