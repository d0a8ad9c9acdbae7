//! Help panel widget.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::config::KeyBindings;
use crate::ui::layout::popup_area;

/// Help panel showing the configured keybindings.
pub struct HelpPanel;

impl HelpPanel {
    /// Render the help panel.
    pub fn render(frame: &mut Frame, area: Rect, kb: &KeyBindings) {
        let popup = popup_area(area, 60, 90);

        // Clear the area behind the popup
        frame.render_widget(Clear, popup);

        let views = format!("{}-{}", kb.markets, kb.admin);
        let nav = format!("{}/↓ {}/↑", kb.down, kb.up);

        let mut help_text = section("Navigation");
        help_text.extend([
            entry(&nav, "Move down / up"),
            entry("g G", "Go to top / bottom"),
            entry("PgUp PgDn", "Page up / down"),
            entry(&views, "Markets, Feed, Watchlist, Alerts, Admin"),
            entry(&kb.select, "Open / confirm"),
            entry(&kb.back, "Close / dismiss"),
        ]);

        help_text.extend(section("Markets"));
        help_text.extend([
            entry(&kb.search, "Search coins"),
            entry("[ ]", "Previous / next page"),
            entry(&kb.favorite, "Add to or remove from watchlist"),
            entry(&kb.compose, "New price alert"),
        ]);

        help_text.extend(section("Feed"));
        help_text.extend([
            entry(&kb.compose, "New post ($coin #bullish img:path), or comment"),
            entry(&kb.like, "Like / unlike"),
            entry(&kb.report, "Report post, or the selected comment"),
            entry(&kb.report_author, "Report the author's profile"),
            entry(&kb.delete, "Delete own post / alert"),
        ]);

        help_text.extend(section("Admin"));
        help_text.extend([
            entry(&kb.next_pane, "Reports, bans, admins"),
            entry(&kb.delete, "Dismiss report / unban / revoke"),
            entry("b", "Ban the reported author"),
            entry(&kb.compose, "Grant a role"),
        ]);

        help_text.extend(section("Account"));
        help_text.extend([
            entry(&kb.sign_in, "Sign in"),
            entry(&kb.sign_up, "Sign up"),
            entry(&kb.sign_out, "Sign out"),
            entry(&kb.profile, "Edit username and bio"),
            entry(&kb.avatar, "Upload avatar"),
            entry(&kb.refresh, "Refresh data"),
            entry(&kb.help, "Toggle help"),
            entry(&kb.quit, "Quit"),
        ]);

        let help = Paragraph::new(help_text)
            .block(
                Block::default()
                    .title(" Help ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().fg(Color::White));

        frame.render_widget(help, popup);
    }
}

fn section(title: &'static str) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    ]
}

fn entry(keys: &str, description: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<11}", keys), Style::default().fg(Color::Cyan)),
        Span::raw(description),
    ])
}
