use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};
use crate::{
    tui::{
        app::{ActivityLog, LogLevel},
        theme::Theme,
    },
    utils::format_timestamp,
};

pub fn render(frame: &mut Frame, area: Rect, activity: &ActivityLog) {
    let theme = Theme::default();
    let visible = usize::from(area.height.saturating_sub(2));

    let items: Vec<ListItem> = activity
        .entries()
        .iter()
        .rev()
        .take(visible)
        .map(|log| {
            let (icon, color) = match log.level {
                LogLevel::Info => ("ℹ", theme.info),
                LogLevel::Success => ("✓", theme.success),
                LogLevel::Warning => ("⚠", theme.warning),
                LogLevel::Error => ("✗", theme.error),
            };

            let content = vec![
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(format!("[{}]", format_timestamp(&log.timestamp)), theme.dimmed()),
                Span::raw(" "),
                Span::raw(log.message.as_str()),
            ];

            ListItem::new(Line::from(content))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Activity")
            .border_style(theme.border()),
    );

    frame.render_widget(list, area);
}
