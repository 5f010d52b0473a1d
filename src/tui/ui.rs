use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use crate::{
    reclamation::ReclamationApi,
    tui::{
        app::{App, Mode},
        components,
        screens,
        theme::Theme,
    },
};

pub fn render_ui<A: ReclamationApi>(frame: &mut Frame, app: &App<A>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(frame.size());

    components::header::render(frame, chunks[0], app);
    screens::reclamations::render(frame, chunks[1], app);
    if let Mode::Form(form) = &app.mode {
        screens::form::render(frame, chunks[1], form);
    }
    render_status_bar(frame, chunks[2], app);
}

fn render_status_bar<A: ReclamationApi>(frame: &mut Frame, area: Rect, app: &App<A>) {
    let theme = Theme::default();
    let mode = match app.mode {
        Mode::List => "List",
        Mode::Detail { .. } => "Detail",
        Mode::Form(_) => "Form",
        Mode::ConfirmDelete(_) => "Delete",
    };

    let text = Line::from(vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default()
                .fg(Color::Black)
                .bg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.status_message.as_str(), Style::default().fg(theme.muted)),
        Span::raw(" | "),
        Span::styled("a: Add", Style::default().fg(theme.warning)),
        Span::raw(" | "),
        Span::styled("q: Quit", Style::default().fg(theme.error)),
    ]);

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}
