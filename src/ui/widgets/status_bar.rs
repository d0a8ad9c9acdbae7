//! Status bar widget.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::common::format_age;
use crate::state::Store;

/// One-row summary of connectivity, session and loading state.
pub struct StatusBar;

impl StatusBar {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store, help_key: &str) {
        let dim = Style::default().fg(Color::Gray);
        let separator = || Span::styled(" │ ", dim);

        let mut spans = vec![Span::styled(
            " hodlr",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];

        spans.push(separator());
        let (dot, color) = if store.app.connected {
            ("●", Color::Green)
        } else {
            ("○", Color::Red)
        };
        spans.push(Span::styled(format!("{} Market data", dot), Style::default().fg(color)));
        if let Some(at) = store.markets.last_updated {
            spans.push(Span::styled(format!(" {}", format_age(at, Utc::now())), dim));
        }

        spans.push(separator());
        spans.push(if store.app.offline {
            Span::styled("Offline", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("Online", Style::default().fg(Color::Green))
        });

        spans.push(separator());
        match &store.app.session {
            Some(session) => {
                spans.push(Span::styled(
                    session.display_name().to_string(),
                    Style::default().fg(Color::White),
                ));
                if let Some(role) = session.admin_role {
                    spans.push(Span::styled(format!(" [{}]", role), Style::default().fg(Color::Magenta)));
                }
            }
            None => spans.push(Span::styled("Signed out", dim)),
        }

        if store.app.loading {
            spans.push(Span::styled(
                "  Loading...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ));
        }

        let hint = Line::styled(format!("{} help ", help_key), dim).right_aligned();
        let [left, right] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(hint.width() as u16)])
                .areas(area);

        let background = Style::default().bg(Color::DarkGray);
        frame.render_widget(Paragraph::new(Line::from(spans)).style(background), left);
        frame.render_widget(Paragraph::new(hint).style(background), right);
    }
}
