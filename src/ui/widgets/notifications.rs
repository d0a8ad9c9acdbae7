//! Toast rendering.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::state::{Notification, NotificationLevel};

fn level_style(level: NotificationLevel) -> (Color, &'static str) {
    match level {
        NotificationLevel::Info => (Color::Cyan, " info "),
        NotificationLevel::Success => (Color::Green, " done "),
        NotificationLevel::Warning => (Color::Yellow, " heads up "),
        NotificationLevel::Error => (Color::Red, " error "),
    }
}

/// Draw a toast over whatever is below `area`.
pub fn render_notification(frame: &mut Frame, area: Rect, notification: &Notification) {
    let (color, title) = level_style(notification.level);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .title(Line::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));

    let toast = Paragraph::new(notification.message.as_str())
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(Clear, area);
    frame.render_widget(toast, area);
}
