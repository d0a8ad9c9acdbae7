//! Price alert widget.

use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Row, Table, TableState},
};

use super::common::{format_age, format_price, render_empty, render_loading};
use crate::state::Store;

/// Alerts of the signed-in user and the ones fired this session.
pub struct AlertList;

impl AlertList {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(8)])
            .split(area);

        Self::render_alerts(frame, chunks[0], store);
        Self::render_recent(frame, chunks[1], store);
    }

    fn render_alerts(frame: &mut Frame, area: Rect, store: &Store) {
        let now = Utc::now();
        let alerts = &store.alerts.alerts;

        let header_cells = ["Coin", "Condition", "Target", "Now", "Status"]
            .iter()
            .map(|h| {
                Cell::from(*h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            });
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = alerts.iter().map(|alert| {
            let current = store
                .markets
                .coin(&alert.coin_id)
                .map(|c| format_price(c.current_price))
                .unwrap_or_else(|| "-".to_string());

            let (status, status_style) = match alert.triggered_at {
                Some(at) => (
                    format!("fired {}", format_age(at, now)),
                    Style::default().fg(Color::DarkGray),
                ),
                None if alert.is_active => ("armed".to_string(), Style::default().fg(Color::Green)),
                None => ("off".to_string(), Style::default().fg(Color::DarkGray)),
            };

            Row::new(vec![
                Cell::from(alert.coin_id.clone()),
                Cell::from(alert.condition.to_string()),
                Cell::from(format_price(alert.target_price)),
                Cell::from(current),
                Cell::from(status).style(status_style),
            ])
            .height(1)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Min(14),
                Constraint::Length(10),
                Constraint::Length(16),
                Constraint::Length(16),
                Constraint::Length(12),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(format!(
                    " Alerts ({} armed / {}) ",
                    store.alerts.armed_count(),
                    alerts.len()
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(store.alerts.selected_index);
        frame.render_stateful_widget(table, area, &mut state);

        if alerts.is_empty() && !store.alerts.loading {
            let message = if store.app.session.is_some() {
                "Press n on a coin to set an alert"
            } else {
                "Sign in to set price alerts"
            };
            render_empty(frame, area, message);
        }
        if store.alerts.loading {
            render_loading(frame, area);
        }
    }

    fn render_recent(frame: &mut Frame, area: Rect, store: &Store) {
        let now = Utc::now();
        let items: Vec<ListItem> = store
            .alerts
            .recent
            .iter()
            .map(|trigger| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>4} ", format_age(trigger.triggered_at, now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled("⚠ ", Style::default().fg(Color::Yellow)),
                    Span::raw(trigger.describe()),
                ]))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title(" Fired this session ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(list, area);
    }
}
