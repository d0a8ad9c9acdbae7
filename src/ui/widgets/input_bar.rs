//! Search and compose input line.

use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::state::{InputMode, Store};

pub struct InputBar;

impl InputBar {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let title = match (&store.app.input_mode, &store.app.compose) {
            (InputMode::Search, _) => " Search ".to_string(),
            (_, Some(target)) => format!(" {} ", target.prompt()),
            _ => String::new(),
        };

        let input = Paragraph::new(store.app.display_input()).block(
            Block::default()
                .title(title)
                .title_bottom(" Enter submit · Esc cancel ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        frame.render_widget(input, area);

        let cursor_x = area.x + 1 + store.app.cursor_position as u16;
        if cursor_x < area.x + area.width.saturating_sub(1) {
            frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
        }
    }
}
