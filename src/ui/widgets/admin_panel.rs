//! Moderation console widget.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Row, Table, TableState},
};

use super::common::{format_age, render_empty, render_loading, truncate};
use crate::state::{AdminPane, Store};

/// Pending reports, active bans and console members.
pub struct AdminPanel;

impl AdminPanel {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        Self::render_reports(frame, chunks[0], store);
        Self::render_bans(frame, lower[0], store);
        Self::render_admins(frame, lower[1], store);
    }

    fn render_reports(frame: &mut Frame, area: Rect, store: &Store) {
        let now = Utc::now();
        let reports = &store.admin.reports;

        let header_cells = ["Age", "Type", "Reason", "Content"].iter().map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = reports.iter().map(|row| {
            let preview = row
                .preview
                .as_deref()
                .map(|p| truncate(p, 40))
                .unwrap_or_else(|| "(deleted)".to_string());

            Row::new(vec![
                Cell::from(format_age(row.report.created_at, now))
                    .style(Style::default().fg(Color::DarkGray)),
                Cell::from(row.report.content_type.to_string()),
                Cell::from(truncate(&row.report.reason, 30)),
                Cell::from(preview),
            ])
            .height(1)
        });

        let role = store
            .admin
            .me
            .as_ref()
            .map(|me| me.role.to_string())
            .unwrap_or_default();

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(8),
                Constraint::Percentage(35),
                Constraint::Min(20),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(format!(" Pending reports ({}) {} ", reports.len(), role))
                .title_bottom(" Enter action · d dismiss · b ban author · Tab next ")
                .borders(Borders::ALL)
                .border_style(pane_style(store, AdminPane::Reports)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(store.admin.selected_index);
        frame.render_stateful_widget(table, area, &mut state);

        if reports.is_empty() && !store.admin.loading {
            render_empty(frame, area, "Nothing to review");
        }
        if store.admin.loading {
            render_loading(frame, area);
        }
    }

    fn render_bans(frame: &mut Frame, area: Rect, store: &Store) {
        let items: Vec<ListItem> = store
            .admin
            .bans
            .iter()
            .map(|ban| {
                let until = ban
                    .expires_at
                    .map(|at| format!("until {}", at.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_else(|| "permanent".to_string());
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", &ban.user_id.to_string()[..8]),
                        Style::default().fg(Color::Red),
                    ),
                    Span::styled(format!("{} ", until), Style::default().fg(Color::DarkGray)),
                    Span::raw(ban.reason.clone()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Active bans ({}) ", store.admin.bans.len()))
                    .title_bottom(" d unban ")
                    .borders(Borders::ALL)
                    .border_style(pane_style(store, AdminPane::Bans)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        if store.admin.pane == AdminPane::Bans {
            state.select(store.admin.ban_index);
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_admins(frame: &mut Frame, area: Rect, store: &Store) {
        let items: Vec<ListItem> = store
            .admin
            .admins
            .iter()
            .map(|admin| {
                let you = if Some(admin.user_id) == store.app.user_id() {
                    " (you)"
                } else {
                    ""
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<12}", admin.role.to_string()),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(format!("{}{}", &admin.user_id.to_string()[..8], you)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Admins ({}) ", store.admin.admins.len()))
                    .title_bottom(" n grant · d revoke ")
                    .borders(Borders::ALL)
                    .border_style(pane_style(store, AdminPane::Admins)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        if store.admin.pane == AdminPane::Admins {
            state.select(store.admin.admin_index);
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn pane_style(store: &Store, pane: AdminPane) -> Style {
    if store.admin.pane == pane {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
