//! Pure render functions over session and picker state.

mod active;
mod footer;
mod graph;
pub mod header;
mod home;
pub mod layout;
mod overlay;
pub mod picker;
mod results;
pub mod theme;
pub mod util;


use ratatui::Frame;

use crate::app::{App, Mode, Tab};
use crate::picker::Picker;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let areas = layout::compute_layout(area);

    header::render(frame, app, areas.header);
    header::render_tabs(frame, app, areas.tabs);

    match app.current_tab() {
        Some(Tab::Home) => home::render(frame, app, areas.body),
        Some(Tab::Active) => {
            if let Some(registry) = &app.registry {
                active::render(frame, registry, areas.body);
            }
        }
        Some(Tab::Query(_)) | None => results::render(frame, app, areas.body),
    }

    footer::render(frame, app, areas.footer);

    match &app.mode {
        Mode::Normal => {}
        Mode::Help => overlay::render_help(frame, app, area),
        Mode::Search(search) => overlay::render_search(frame, app, search, area),
        Mode::Edit(editor) => overlay::render_editor(frame, editor, area),
    }
}

pub fn render_picker(frame: &mut Frame, picker: &Picker) {
    picker::render(frame, picker, frame.area());
}
