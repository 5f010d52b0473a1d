use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use crate::{reclamation::RemoveTarget, tui::theme::Theme};

pub fn render(frame: &mut Frame, area: Rect, target: &RemoveTarget) {
    let theme = Theme::default();
    let popup = centered(area, 50, 7);

    let text = vec![
        Line::from(vec![
            Span::raw("Delete "),
            Span::styled(format!("\"{}\"", target.name), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" (#{})?", target.id)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", theme.key()),
            Span::raw(" delete   "),
            Span::styled("n", theme.key()),
            Span::raw(" cancel"),
        ]),
    ];

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(theme.error)),
        );

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}

/// A `width`% wide, `height` rows tall rect centred in `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Percentage((100 - width) / 2),
        ])
        .split(vertical[1])[1]
}
