use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use crate::{reclamation::RecordQuery, tui::theme::Theme};

pub fn render(frame: &mut Frame, area: Rect, id: i64, query: &RecordQuery) {
    let theme = Theme::default();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Reclamation #{}", id))
        .border_style(theme.border());

    let label = |text: &'static str| Span::styled(format!("{:<13}", text), theme.key());

    let mut lines = match (&query.data, &query.error) {
        (_, Some(err)) => vec![
            Line::from(Span::styled(
                "Could not load reclamation",
                Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(err.to_string(), Style::default().fg(theme.muted))),
        ],
        (Some(record), None) => vec![
            Line::from(vec![label("Id"), Span::raw(record.id.to_string())]),
            Line::from(vec![
                label("Name"),
                Span::styled(record.name.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(vec![
                label("Link"),
                Span::styled(record.link.as_str(), Style::default().fg(theme.info)),
            ]),
            Line::from(vec![
                label("Description"),
                match &record.description {
                    Some(text) => Span::raw(text.as_str()),
                    None => Span::styled("—", theme.dimmed()),
                },
            ]),
        ],
        (None, None) => vec![Line::from(Span::styled("Loading…", Style::default().fg(theme.info)))],
    };

    if query.is_fetching && query.data.is_some() {
        lines.push(Line::from(Span::styled("refreshing…", theme.dimmed())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("e", theme.key()),
        Span::raw(" edit  "),
        Span::styled("r", theme.key()),
        Span::raw(" reload  "),
        Span::styled("Esc", theme.key()),
        Span::raw(" back"),
    ]));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
        .block(block);

    frame.render_widget(paragraph, area);
}
