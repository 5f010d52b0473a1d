use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use crate::{
    reclamation::{service::total_pages, ListQuery},
    tui::theme::Theme,
};

/// Footer pagination over a one-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u32,
    pub total_items: u64,
    pub is_loading_page: bool,
}

impl Pagination {
    pub fn from_query(page: u64, query: &ListQuery) -> Self {
        Self {
            page,
            page_size: query.params.size,
            total_items: query.total_items(),
            is_loading_page: query.is_loading_page(),
        }
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_items, self.page_size)
    }

    pub fn first_page(&self) -> u64 {
        1
    }

    pub fn last_page(&self) -> u64 {
        self.total_pages().max(1)
    }

    pub fn can_go_prev(&self) -> bool {
        !self.is_loading_page && self.page > 1
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_loading_page && self.page < self.total_pages()
    }

    /// "21-40 of 45", or "0 of 0" for an empty collection.
    pub fn info(&self) -> String {
        if self.total_items == 0 {
            return "0 of 0".to_string();
        }
        let size = u64::from(self.page_size);
        let from = self.page.saturating_sub(1) * size + 1;
        let to = (self.page * size).min(self.total_items);
        format!("{}-{} of {}", from.min(self.total_items), to, self.total_items)
    }
}

pub fn render(frame: &mut Frame, area: Rect, pagination: &Pagination) {
    let theme = Theme::default();
    let button = |label: &'static str, enabled: bool| {
        if enabled {
            Span::styled(label, theme.key())
        } else {
            Span::styled(label, theme.dimmed())
        }
    };

    let mut spans = vec![
        button(" « first ", pagination.can_go_prev()),
        button(" ‹ prev ", pagination.can_go_prev()),
        Span::raw("   "),
        Span::styled(
            format!(
                "Page {} of {} · {}",
                pagination.page,
                pagination.last_page(),
                pagination.info()
            ),
            Style::default().fg(theme.foreground),
        ),
        Span::raw("   "),
        button(" next › ", pagination.can_go_next()),
        button(" last » ", pagination.can_go_next()),
    ];
    if pagination.is_loading_page {
        spans.push(Span::styled("  loading…", Style::default().fg(theme.info)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(theme.border()));

    frame.render_widget(paragraph, area);
}
