use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};
use crate::tui::theme::Theme;

pub const KEYBINDINGS: &[(&str, &str)] = &[
    ("↑ / ↓  j / k", "Select row"),
    ("← / →  p / n", "Previous / next page"),
    ("g / G", "First / last page"),
    ("[ / ]", "Back / forward"),
    ("Enter", "Show details"),
    ("a", "Add reclamation"),
    ("e", "Edit selected"),
    ("d", "Delete selected"),
    ("r", "Retry / reload"),
    ("q / Esc", "Quit"),
];

pub fn render(frame: &mut Frame, area: Rect) {
    let theme = Theme::default();
    let items: Vec<ListItem> = KEYBINDINGS
        .iter()
        .map(|(key, desc)| {
            let content = vec![
                Span::styled(format!("{:14}", key), theme.key()),
                Span::raw(" "),
                Span::styled(*desc, Style::default().fg(theme.foreground)),
            ];
            ListItem::new(Line::from(content))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Keys")
            .border_style(theme.border()),
    );

    frame.render_widget(list, area);
}
