use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use crate::{reclamation::ReclamationApi, tui::{app::App, theme::Theme}};

pub fn render<A: ReclamationApi>(frame: &mut Frame, area: Rect, app: &App<A>) {
    let theme = Theme::default();
    let title = vec![
        Span::styled("Reclamation Admin", theme.title()),
        Span::raw(" | "),
        Span::styled(app.history.current().to_string(), Style::default().fg(theme.success)),
        Span::raw(" | "),
        Span::styled(format!("API: {}", app.api_url), Style::default().fg(theme.muted)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border());

    let paragraph = Paragraph::new(Line::from(title))
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
