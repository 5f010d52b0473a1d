use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use crate::{
    error::Error,
    reclamation::Reclamation,
    tui::{list_state::ListState, theme::Theme},
    utils::truncate,
};

const NAME_WIDTH: u16 = 40;
const ACTIONS_WIDTH: u16 = 16;

pub fn render(frame: &mut Frame, area: Rect, state: ListState<'_>, selected: usize, title: &str) {
    let theme = Theme::default();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(theme.border());

    match state {
        ListState::Loading => {
            let paragraph = Paragraph::new(Span::styled("Loading reclamations…", Style::default().fg(theme.info)))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
        }
        ListState::Error(err) => render_error(frame, area, block, err),
        ListState::Empty => {
            let text = Text::from(vec![
                Line::from(Span::styled("No reclamations yet", Style::default().fg(theme.foreground))),
                Line::from(vec![
                    Span::raw("Press "),
                    Span::styled("a", theme.key()),
                    Span::raw(" to add one"),
                ]),
            ]);
            let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(block);
            frame.render_widget(paragraph, area);
        }
        ListState::Populated(rows) => render_table(frame, area, block, rows, selected),
    }
}

fn render_error(frame: &mut Frame, area: Rect, block: Block<'_>, err: &Error) {
    let theme = Theme::default();
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Could not load reclamations",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(err.to_string(), Style::default().fg(theme.muted))),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("r", theme.key()),
            Span::raw(" to retry"),
        ]),
    ]);
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_table(frame: &mut Frame, area: Rect, block: Block<'_>, rows: &[Reclamation], selected: usize) {
    let theme = Theme::default();
    let header_cells = ["Name", "Description", "Actions"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(theme.warning)));

    let header = Row::new(header_cells)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .height(1)
        .bottom_margin(1);

    let name_width = usize::from(NAME_WIDTH.saturating_sub(2));
    let description_width = usize::from(area.width.saturating_sub(NAME_WIDTH + ACTIONS_WIDTH + 6)).max(8);

    let rows = rows.iter().enumerate().map(|(index, record)| {
        // Two-line cell: name above its link
        let name = Text::from(vec![
            Line::from(Span::styled(
                truncate(&record.name, name_width),
                Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(truncate(&record.link, name_width), Style::default().fg(theme.info))),
        ]);
        let description = match &record.description {
            Some(text) => Cell::from(truncate(text, description_width)),
            None => Cell::from("—").style(theme.dimmed()),
        };
        let actions = if index == selected {
            Cell::from("e edit · d del").style(theme.key())
        } else {
            Cell::from("")
        };

        Row::new(vec![Cell::from(name), description, actions]).height(2)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(NAME_WIDTH),
            Constraint::Min(10),
            Constraint::Length(ACTIONS_WIDTH),
        ],
    )
    .header(header)
    .block(block)
    .highlight_style(Style::default().bg(theme.selection).add_modifier(Modifier::BOLD))
    .highlight_symbol(">> ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}
