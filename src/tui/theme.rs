use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub primary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub foreground: Color,
    pub muted: Color,
    pub selection: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::LightBlue,
            foreground: Color::White,
            muted: Color::Gray,
            selection: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn border(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::DIM)
    }

    pub fn key(&self) -> Style {
        Style::default().fg(self.warning).add_modifier(Modifier::BOLD)
    }
}
