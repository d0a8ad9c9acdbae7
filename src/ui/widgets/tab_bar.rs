//! Tab bar widget.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::config::KeyBindings;
use crate::state::{Store, View};

/// Tab bar widget.
pub struct TabBar;

impl TabBar {
    /// Render the tab bar. The admin tab only shows for admins.
    pub fn render(frame: &mut Frame, area: Rect, store: &Store, keys: &KeyBindings) {
        let mut spans = vec![Span::raw(" ")];

        for view in View::ALL {
            if view == View::Admin && !store.app.is_admin() {
                continue;
            }
            let key = match view {
                View::Markets => &keys.markets,
                View::Feed => &keys.feed,
                View::Watchlist => &keys.watchlist,
                View::Alerts => &keys.alerts,
                View::Admin => &keys.admin,
            };

            let name_style = if store.app.current_view == view {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::White)
            };

            spans.push(Span::styled(
                format!("[{}] ", key),
                Style::default().fg(Color::DarkGray),
            ));
            spans.push(Span::styled(view.title(), name_style));
            if view == View::Alerts && store.alerts.armed_count() > 0 {
                spans.push(Span::styled(
                    format!(" ({})", store.alerts.armed_count()),
                    Style::default().fg(Color::Yellow),
                ));
            }
            spans.push(Span::raw("  "));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
