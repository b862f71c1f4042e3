use ratatui::style::{Color, Modifier, Style};

pub struct LyricStyles {
    pub before: Style,
    pub current: Style,
    pub after: Style,
    /// Current line while a drag is previewing a new position.
    pub pending: Style,
    pub header: Style,
    pub notice: Style,
    pub gauge: Style,
}

impl Default for LyricStyles {
    fn default() -> Self {
        Self {
            before: Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
            current: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            after: Style::default(),
            pending: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            header: Style::default().add_modifier(Modifier::BOLD),
            notice: Style::default().fg(Color::Red),
            gauge: Style::default().fg(Color::Green).bg(Color::DarkGray),
        }
    }
}
