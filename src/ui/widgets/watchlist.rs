//! Watchlist widget.

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};

use super::common::{change_style, format_percent, format_price, render_empty, render_loading};
use crate::state::Store;

/// Favorite coins joined with the loaded market prices.
pub struct WatchlistView;

impl WatchlistView {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let favorites = &store.watchlist.favorites;

        let header_cells = ["Coin", "Price", "24h", "Alerts"].iter().map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows = favorites.iter().map(|favorite| {
            let coin = store.markets.coin(&favorite.coin_id);
            let armed = store
                .alerts
                .alerts
                .iter()
                .filter(|a| a.coin_id == favorite.coin_id && a.is_armed())
                .count();

            let name = coin
                .map(|c| format!("{} {}", c.ticker(), c.name))
                .unwrap_or_else(|| favorite.coin_id.clone());
            let price = coin
                .map(|c| format_price(c.current_price))
                .unwrap_or_else(|| "-".to_string());
            let change = coin.and_then(|c| c.price_change_24h_percent);

            Row::new(vec![
                Cell::from(name),
                Cell::from(price),
                Cell::from(change.map(format_percent).unwrap_or_else(|| "-".into()))
                    .style(change_style(change)),
                Cell::from(if armed > 0 { armed.to_string() } else { String::new() })
                    .style(Style::default().fg(Color::Yellow)),
            ])
            .height(1)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(16),
                Constraint::Length(9),
                Constraint::Length(7),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(format!(" Watchlist ({}) ", favorites.len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(store.watchlist.selected_index);
        frame.render_stateful_widget(table, area, &mut state);

        if favorites.is_empty() && !store.watchlist.loading {
            let message = if store.app.session.is_some() {
                "Press w on a coin in Markets to watch it"
            } else {
                "Sign in to keep a watchlist"
            };
            render_empty(frame, area, message);
        }
        if store.watchlist.loading {
            render_loading(frame, area);
        }
    }
}
