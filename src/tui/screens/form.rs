use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use crate::tui::{
    app::{FormField, FormState},
    components::confirm::centered,
    theme::Theme,
};

pub fn render(frame: &mut Frame, area: Rect, form: &FormState) {
    let theme = Theme::default();
    let popup = centered(area, 70, 15);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(form.title(), theme.title()))
        .border_style(theme.border());
    let inner = block.inner(popup);

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    for (index, field) in FormField::ALL.iter().enumerate() {
        let area = rows[index];
        let input = form.input(*field);
        let focused = form.focus == *field;

        let width = usize::from(area.width.saturating_sub(2));
        let scroll = input.visual_scroll(width);
        let border = if focused {
            Style::default().fg(theme.warning)
        } else {
            theme.border()
        };
        let paragraph = Paragraph::new(input.value())
            .scroll((0, u16::try_from(scroll).unwrap_or(u16::MAX)))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(field.label())
                    .border_style(border),
            );
        frame.render_widget(paragraph, area);

        if focused {
            let cursor = input.visual_cursor().saturating_sub(scroll);
            frame.set_cursor(
                area.x + 1 + u16::try_from(cursor).unwrap_or(0),
                area.y + 1,
            );
        }
    }

    if let Some(error) = &form.error {
        let line = Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line), rows[3]);
    }

    let hints = Line::from(vec![
        Span::styled("Tab", theme.key()),
        Span::raw(" next field  "),
        Span::styled("Enter", theme.key()),
        Span::raw(" save  "),
        Span::styled("Esc", theme.key()),
        Span::raw(" cancel"),
    ]);
    frame.render_widget(Paragraph::new(hints), rows[4]);
}
