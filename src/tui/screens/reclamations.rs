use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};
use crate::{
    reclamation::ReclamationApi,
    tui::{
        app::{App, Mode},
        components,
    },
};

pub fn render<A: ReclamationApi>(frame: &mut Frame, area: Rect, app: &App<A>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(72), // List
            Constraint::Percentage(28), // Keys + activity
        ])
        .split(area);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Rows or detail
            Constraint::Length(3), // Pagination
        ])
        .split(columns[0]);

    match &app.mode {
        Mode::Detail { id } => components::detail::render(frame, main[0], *id, &app.detail),
        _ => {
            let title = format!("Reclamations ({})", app.list.total_items());
            components::data_list::render(frame, main[0], app.list_state(), app.selected_index, &title);
        }
    }
    components::pagination::render(frame, main[1], &app.pagination());

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(components::help::KEYBINDINGS.len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    components::help::render(frame, side[0]);
    components::logs::render(frame, side[1], &app.activity);

    if let Mode::ConfirmDelete(target) = &app.mode {
        components::confirm::render(frame, area, target);
    }
}
